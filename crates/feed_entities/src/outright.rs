use crate::entity::{keys, FeedEntity};
use crate::livescore::Scoreboard;
use crate::market::Market;
use crate::shared::{NameValuePair, NamedRef, Participant, Subscription};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightFixture {
    pub sport: Option<NamedRef>,
    pub location: Option<NamedRef>,
    pub start_date: Option<String>,
    pub last_update: Option<String>,
    pub status: Option<i32>,
    pub participants: Vec<Participant>,
    pub extra_data: Vec<NameValuePair>,
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightScore {
    pub participant_results: Vec<OutrightParticipantResult>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightParticipantResult {
    pub participant_id: i64,
    pub name: Option<String>,
    pub result: Option<i32>,
    pub scoreboard: Option<Scoreboard>,
}

/// One fixture inside an outright competition
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightEvent {
    pub fixture_id: i64,
    pub outright_fixture: Option<OutrightFixture>,
    pub outright_score: Option<OutrightScore>,
    pub markets: Vec<Market>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightCompetition {
    pub id: i64,
    pub name: Option<String>,
    pub r#type: Option<i32>,
    pub events: Vec<OutrightEvent>,
}

/// League-level outright: a competition that nests further competitions
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightLeagueCompetition {
    pub id: i64,
    pub name: Option<String>,
    pub r#type: Option<i32>,
    pub competitions: Vec<OutrightCompetition>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightFixtureUpdate {
    pub competition: Option<OutrightCompetition>,
}

impl FeedEntity for OutrightFixtureUpdate {
    const ENTITY_KEY: i32 = keys::OUTRIGHT_FIXTURE;
    const NAME: &'static str = "OutrightFixtureUpdate";
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightScoreUpdate {
    pub competition: Option<OutrightCompetition>,
}

impl FeedEntity for OutrightScoreUpdate {
    const ENTITY_KEY: i32 = keys::OUTRIGHT_SCORE;
    const NAME: &'static str = "OutrightScoreUpdate";
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightFixtureMarketUpdate {
    pub competition: Option<OutrightCompetition>,
}

impl FeedEntity for OutrightFixtureMarketUpdate {
    const ENTITY_KEY: i32 = keys::OUTRIGHT_FIXTURE_MARKET;
    const NAME: &'static str = "OutrightFixtureMarketUpdate";
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightLeagueUpdate {
    pub competition: Option<OutrightLeagueCompetition>,
}

impl FeedEntity for OutrightLeagueUpdate {
    const ENTITY_KEY: i32 = keys::OUTRIGHT_LEAGUE;
    const NAME: &'static str = "OutrightLeagueUpdate";
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightLeagueMarketUpdate {
    pub competition: Option<OutrightLeagueCompetition>,
}

impl FeedEntity for OutrightLeagueMarketUpdate {
    const ENTITY_KEY: i32 = keys::OUTRIGHT_LEAGUE_MARKET;
    const NAME: &'static str = "OutrightLeagueMarketUpdate";
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OutrightSettlementsUpdate {
    pub competition: Option<OutrightCompetition>,
}

impl FeedEntity for OutrightSettlementsUpdate {
    const ENTITY_KEY: i32 = keys::OUTRIGHT_SETTLEMENT;
    const NAME: &'static str = "OutrightSettlementsUpdate";
}
