use crate::entity::{keys, FeedEntity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Bet {
    pub id: i64,
    pub name: Option<String>,
    pub line: Option<String>,
    pub base_line: Option<String>,
    pub status: Option<i32>,
    pub start_price: Option<String>,
    pub price: Option<String>,
    pub settlement: Option<i32>,
    pub provider_bet_id: Option<String>,
    pub last_update: Option<String>,
    pub participant_id: Option<i64>,
    pub player_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Market {
    pub id: i64,
    pub name: Option<String>,
    pub main_line: Option<String>,
    pub bets: Vec<Bet>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct MarketEvent {
    pub fixture_id: i64,
    pub markets: Vec<Market>,
}

/// Odds changes for one or more fixtures
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct MarketUpdate {
    pub events: Vec<MarketEvent>,
}

impl FeedEntity for MarketUpdate {
    const ENTITY_KEY: i32 = keys::MARKET;
    const NAME: &'static str = "MarketUpdate";
}

/// Bet settlements; same shape as a market update, `Bet::settlement` is set
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SettlementUpdate {
    pub events: Vec<MarketEvent>,
}

impl FeedEntity for SettlementUpdate {
    const ENTITY_KEY: i32 = keys::SETTLEMENT;
    const NAME: &'static str = "SettlementUpdate";
}
