use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use super::{now_rfc3339, SqliteStore};
use crate::{
    arguments::is_debug_database_enabled,
    errors::AppResult,
    logger::{self, LogTag},
    stars::{ProfileRecord, StarRecord, StarStore},
};

#[async_trait]
impl StarStore for SqliteStore {
    async fn profile(&self, profile_id: &str) -> AppResult<Option<ProfileRecord>> {
        let conn = self.conn.lock();
        let profile = conn
            .query_row(
                "SELECT id, owner_id, is_public FROM profiles WHERE id = ?1",
                params![profile_id],
                |row| {
                    Ok(ProfileRecord {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        is_public: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    async fn has_star(&self, profile_id: &str, actor_id: &str) -> AppResult<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM profile_stars WHERE profile_id = ?1 AND actor_id = ?2",
                params![profile_id, actor_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn count_stars(&self, profile_id: &str) -> AppResult<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM profile_stars WHERE profile_id = ?1",
            params![profile_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    async fn list_stars(&self, profile_id: &str, offset: u64, limit: u64) -> AppResult<Vec<StarRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT actor_id, created_at FROM profile_stars
             WHERE profile_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(params![profile_id, limit as i64, offset as i64], |row| {
                Ok(StarRecord {
                    actor_id: row.get(0)?,
                    created_at: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn insert_star(&self, profile_id: &str, actor_id: &str) -> AppResult<bool> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO profile_stars (profile_id, actor_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![profile_id, actor_id, now_rfc3339()],
        )?;
        if is_debug_database_enabled() {
            logger::debug(
                LogTag::Database,
                &format!("insert_star {} by {} -> {}", profile_id, actor_id, inserted),
            );
        }
        Ok(inserted > 0)
    }

    async fn delete_star(&self, profile_id: &str, actor_id: &str) -> AppResult<bool> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM profile_stars WHERE profile_id = ?1 AND actor_id = ?2",
            params![profile_id, actor_id],
        )?;
        if is_debug_database_enabled() {
            logger::debug(
                LogTag::Database,
                &format!("delete_star {} by {} -> {}", profile_id, actor_id, deleted),
            );
        }
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_profile("p1", "owner", true).unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_and_delete_are_idempotent() {
        let store = store();
        assert!(store.insert_star("p1", "alice").await.unwrap());
        assert!(!store.insert_star("p1", "alice").await.unwrap());
        assert!(store.has_star("p1", "alice").await.unwrap());
        assert_eq!(store.count_stars("p1").await.unwrap(), 1);

        assert!(store.delete_star("p1", "alice").await.unwrap());
        assert!(!store.delete_star("p1", "alice").await.unwrap());
        assert!(!store.has_star("p1", "alice").await.unwrap());
        assert_eq!(store.count_stars("p1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_stars_paginates() {
        let store = store();
        for actor in ["a", "b", "c", "d", "e"] {
            store.insert_star("p1", actor).await.unwrap();
        }
        store.insert_star("other", "z").await.unwrap();

        let first = store.list_stars("p1", 0, 2).await.unwrap();
        let rest = store.list_stars("p1", 2, 10).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(rest.len(), 3);

        let mut all: Vec<_> = first.iter().chain(rest.iter()).map(|r| r.actor_id.clone()).collect();
        all.sort();
        assert_eq!(all, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_profile_lookup() {
        let store = store();
        store.upsert_profile("hidden", "bob", false).unwrap();

        let profile = store.profile("hidden").await.unwrap().unwrap();
        assert_eq!(profile.owner_id, "bob");
        assert!(!profile.is_public);
        assert!(store.profile("missing").await.unwrap().is_none());
    }
}
