use crate::entity::{keys, FeedEntity};
use crate::shared::{NameValuePair, ScoreResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Scoreboard {
    pub status: Option<i32>,
    pub current_period: Option<i32>,
    pub time: Option<String>,
    pub results: Vec<ScoreResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Period {
    pub r#type: Option<i32>,
    pub is_finished: Option<bool>,
    pub is_confirmed: Option<bool>,
    pub results: Vec<ScoreResult>,
    pub sequence_number: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Statistic {
    pub r#type: Option<i32>,
    pub results: Vec<ScoreResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Livescore {
    pub scoreboard: Option<Scoreboard>,
    pub periods: Vec<Period>,
    pub statistics: Vec<Statistic>,
    pub livescore_extra_data: Vec<NameValuePair>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct LivescoreEvent {
    pub fixture_id: i64,
    pub livescore: Option<Livescore>,
}

/// Score, period and statistics changes for running fixtures
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct LivescoreUpdate {
    pub events: Vec<LivescoreEvent>,
}

impl FeedEntity for LivescoreUpdate {
    const ENTITY_KEY: i32 = keys::LIVESCORE;
    const NAME: &'static str = "LivescoreUpdate";
}
