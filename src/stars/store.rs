/// Durable store seam for star records
///
/// The store is the system of record: existence checks and listings always
/// go here, never to the cache.
use async_trait::async_trait;
use serde::Serialize;

use crate::errors::AppResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub id: String,
    pub owner_id: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarRecord {
    pub actor_id: String,
    pub created_at: String,
}

#[async_trait]
pub trait StarStore: Send + Sync {
    async fn profile(&self, profile_id: &str) -> AppResult<Option<ProfileRecord>>;

    async fn has_star(&self, profile_id: &str, actor_id: &str) -> AppResult<bool>;

    async fn count_stars(&self, profile_id: &str) -> AppResult<u64>;

    /// Newest first
    async fn list_stars(&self, profile_id: &str, offset: u64, limit: u64) -> AppResult<Vec<StarRecord>>;

    /// Returns false when the star already existed
    async fn insert_star(&self, profile_id: &str, actor_id: &str) -> AppResult<bool>;

    /// Returns false when there was nothing to delete
    async fn delete_star(&self, profile_id: &str, actor_id: &str) -> AppResult<bool>;
}
