use crate::entity::{keys, FeedEntity};
use crate::shared::NameValuePair;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct KeepAlive {
    pub active_events: Vec<i64>,
    pub extra_data: Vec<NameValuePair>,
    pub provider_id: Option<i32>,
}

/// Periodic list of fixtures the platform still considers active.
///
/// The body is often empty; an empty body decodes to the default value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct KeepAliveUpdate {
    pub keep_alive: Option<KeepAlive>,
}

impl FeedEntity for KeepAliveUpdate {
    const ENTITY_KEY: i32 = keys::KEEP_ALIVE;
    const NAME: &'static str = "KeepAliveUpdate";
}

/// Connection liveness signal; carries no payload
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatUpdate {}

impl FeedEntity for HeartbeatUpdate {
    const ENTITY_KEY: i32 = keys::HEARTBEAT;
    const NAME: &'static str = "HeartbeatUpdate";
}
