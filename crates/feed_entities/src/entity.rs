use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// A top-level payload type that can appear in an envelope body.
pub trait FeedEntity: DeserializeOwned + Debug + Send + Sync + 'static {
    /// Value of `Header.Type` identifying this payload
    const ENTITY_KEY: i32;
    /// Stable name used in logs
    const NAME: &'static str;
}

/// Entity keys assigned by the distribution platform
pub mod keys {
    pub const FIXTURE_METADATA: i32 = 1;
    pub const LIVESCORE: i32 = 2;
    pub const MARKET: i32 = 3;
    pub const KEEP_ALIVE: i32 = 31;
    pub const HEARTBEAT: i32 = 32;
    pub const SETTLEMENT: i32 = 35;
    pub const OUTRIGHT_FIXTURE: i32 = 37;
    pub const OUTRIGHT_SCORE: i32 = 38;
    pub const OUTRIGHT_FIXTURE_MARKET: i32 = 39;
    pub const OUTRIGHT_LEAGUE: i32 = 40;
    pub const OUTRIGHT_LEAGUE_MARKET: i32 = 41;
    pub const OUTRIGHT_SETTLEMENT: i32 = 42;
}
