use serde::Serialize;

use super::store::StarRecord;

/// Result of a star/unstar action, reflecting the optimistic state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarOutcome {
    pub profile_id: String,
    pub has_starred: bool,
    /// Present when the cached count was live and could be adjusted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_count: Option<u64>,
    /// Server time in milliseconds
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarStatus {
    pub profile_id: String,
    pub has_starred: bool,
    pub star_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarsPage {
    pub rows: Vec<StarRecord>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_more: bool,
}
