//! Payload shapes carried in the `Body` of feed envelopes.
//!
//! Every top-level update type implements [`FeedEntity`], which declares the
//! integer key the platform puts in `Header.Type` for it. Nested types are
//! plain serde structs; all fields are optional or defaulted because the
//! platform omits anything that did not change.

mod entity;
mod fixture;
mod keep_alive;
mod livescore;
mod market;
mod outright;
mod shared;

pub use entity::*;
pub use fixture::*;
pub use keep_alive::*;
pub use livescore::*;
pub use market::*;
pub use outright::*;
pub use shared::*;
