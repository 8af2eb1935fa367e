//! Routing and dispatch engine for the odds distribution feed.
//!
//! Deliveries flow one way: [`FeedConnection`] pulls them off the broker,
//! [`DispatchService`] decodes the envelope, and [`Dispatcher`] resolves the
//! entity type through the [`EntityRegistry`] and hands the typed body to the
//! handler bound in the [`HandlerTable`] for that flow.

mod codec;
mod config;
mod connection;
mod dispatcher;
mod error;
mod flow;
mod handlers;
pub mod middleware;
mod registry;
mod service;

#[cfg(test)]
mod testing;

pub use codec::*;
pub use config::*;
pub use connection::*;
pub use dispatcher::*;
pub use error::*;
pub use flow::*;
pub use handlers::*;
pub use registry::*;
pub use service::*;
