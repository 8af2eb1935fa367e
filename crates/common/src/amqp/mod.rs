mod client;
mod delivery;
mod settings;
mod traits;

pub use client::*;
pub use delivery::*;
pub use settings::*;
pub use traits::*;
