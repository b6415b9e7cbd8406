use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::SqliteStore;
use crate::{
    errors::AppResult,
    identity::{IdentityProvider, SessionInfo},
};

impl SqliteStore {
    /// Register a session; `expires_at = None` never expires
    pub fn create_session(
        &self,
        session_key: &str,
        user_id: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO sessions (session_key, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![session_key, user_id, expires_at.map(|t| t.timestamp_millis())],
        )?;
        Ok(())
    }

    pub fn revoke_session(&self, session_key: &str) -> AppResult<bool> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE session_key = ?1",
            params![session_key],
        )?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl IdentityProvider for SqliteStore {
    async fn validate(&self, session_key: &str) -> AppResult<Option<SessionInfo>> {
        if session_key.is_empty() {
            return Ok(None);
        }
        let now = Utc::now().timestamp_millis();
        let conn = self.conn.lock();
        let user_id: Option<String> = conn
            .query_row(
                "SELECT user_id FROM sessions
                 WHERE session_key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![session_key, now],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user_id.map(|user_id| SessionInfo {
            session_key: session_key.to_string(),
            user_id,
        }))
    }

    async fn sessions_for_user(&self, user_id: &str) -> AppResult<Vec<String>> {
        let now = Utc::now().timestamp_millis();
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT session_key FROM sessions
             WHERE user_id = ?1 AND (expires_at IS NULL OR expires_at > ?2)
             ORDER BY session_key",
        )?;
        let keys = stmt
            .query_map(params![user_id, now], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_expired_sessions_are_invalid() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_session("live", "alice", None).unwrap();
        store
            .create_session("old", "alice", Some(Utc::now() - Duration::minutes(5)))
            .unwrap();

        let info = store.validate("live").await.unwrap().unwrap();
        assert_eq!(info.user_id, "alice");
        assert!(store.validate("old").await.unwrap().is_none());
        assert!(store.validate("").await.unwrap().is_none());
        assert_eq!(store.sessions_for_user("alice").await.unwrap(), vec!["live"]);
    }

    #[tokio::test]
    async fn test_revoke_session() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_session("k", "bob", None).unwrap();
        assert!(store.revoke_session("k").unwrap());
        assert!(!store.revoke_session("k").unwrap());
        assert!(store.validate("k").await.unwrap().is_none());
    }
}
