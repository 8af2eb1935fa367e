use crate::entity::{keys, FeedEntity};
use crate::shared::{NameValuePair, NamedRef, Participant, Subscription};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Fixture {
    pub sport: Option<NamedRef>,
    pub location: Option<NamedRef>,
    pub league: Option<NamedRef>,
    pub start_date: Option<String>,
    pub last_update: Option<String>,
    pub status: Option<i32>,
    pub participants: Vec<Participant>,
    pub fixture_extra_data: Vec<NameValuePair>,
    pub external_fixture_id: Option<String>,
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FixtureEvent {
    pub fixture_id: i64,
    pub fixture: Option<Fixture>,
}

/// Fixture metadata changed (start time, participants, status)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FixtureMetadataUpdate {
    pub events: Vec<FixtureEvent>,
}

impl FeedEntity for FixtureMetadataUpdate {
    const ENTITY_KEY: i32 = keys::FIXTURE_METADATA;
    const NAME: &'static str = "FixtureMetadataUpdate";
}
