use serde::{Deserialize, Serialize};

/// Free-form extra data attached to fixtures, scores and keep-alives
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct NameValuePair {
    pub name: Option<String>,
    pub value: Option<String>,
}

/// Id/name reference used for sports, locations and leagues
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct NamedRef {
    pub id: i64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Participant {
    pub id: i64,
    pub name: Option<String>,
    pub position: Option<String>,
    pub rotation_id: Option<i64>,
    pub is_active: Option<i32>,
    pub extra_data: Vec<NameValuePair>,
}

/// Subscription state of a fixture for the receiving package
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Subscription {
    pub r#type: Option<i32>,
    pub status: Option<i32>,
}

/// One side's value in a score, period or statistic
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ScoreResult {
    pub position: Option<String>,
    pub value: Option<String>,
}
