/// Session validation seam
///
/// Sessions are issued elsewhere; this crate only asks whether a session key
/// is live and which user it belongs to.
use async_trait::async_trait;

use crate::errors::AppResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_key: String,
    pub user_id: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a session key, `None` when unknown or expired
    async fn validate(&self, session_key: &str) -> AppResult<Option<SessionInfo>>;

    /// Every live session key held by `user_id` (one per tab or device)
    async fn sessions_for_user(&self, user_id: &str) -> AppResult<Vec<String>>;
}
