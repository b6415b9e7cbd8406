/// SQLite store - durable source of truth
///
/// Holds profiles, star records, inbox notifications and sessions in one
/// database file. A single connection sits behind a mutex; every statement is
/// short, so callers on async tasks lock it directly.
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

use crate::{
    arguments::is_debug_database_enabled,
    errors::{AppError, AppResult},
    logger::{self, LogTag},
};

mod notifications;
mod sessions;
mod stars;

pub use notifications::NotificationRecord;

// =============================================================================
// SCHEMA
// =============================================================================

const SCHEMA: &[(&str, &str)] = &[
    (
        "profiles",
        "CREATE TABLE IF NOT EXISTS profiles (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL,
            is_public   INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL
        )",
    ),
    (
        "profile_stars",
        "CREATE TABLE IF NOT EXISTS profile_stars (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            profile_id  TEXT NOT NULL,
            actor_id    TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            UNIQUE(profile_id, actor_id)
        )",
    ),
    (
        "notifications",
        "CREATE TABLE IF NOT EXISTS notifications (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT NOT NULL,
            kind        TEXT NOT NULL,
            title       TEXT NOT NULL,
            body        TEXT NOT NULL DEFAULT '',
            data        TEXT NOT NULL DEFAULT '{}',
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        )",
    ),
    (
        "sessions",
        "CREATE TABLE IF NOT EXISTS sessions (
            session_key TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            expires_at  INTEGER
        )",
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_profile_stars_profile ON profile_stars(profile_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, is_read, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
];

// =============================================================================
// STORE
// =============================================================================

pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: String,
}

impl SqliteStore {
    /// Open (or create) the database file and initialize the schema
    pub fn open(path: &str) -> AppResult<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Database(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(30_000))?;

        let store = Self::from_connection(conn, path)?;
        logger::info(LogTag::Database, &format!("Database initialized at {}", path));
        Ok(store)
    }

    /// Private in-memory database, used by tests
    pub fn open_in_memory() -> AppResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, ":memory:")
    }

    fn from_connection(conn: Connection, path: &str) -> AppResult<Self> {
        for (table, sql) in SCHEMA {
            conn.execute(sql, []).map_err(|e| {
                AppError::Database(format!("Failed to create {} table: {}", table, e))
            })?;
        }
        for sql in INDEXES {
            conn.execute(sql, [])?;
        }

        if is_debug_database_enabled() {
            logger::debug(LogTag::Database, &format!("Schema ready ({})", path));
        }

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Create or replace a profile row
    pub fn upsert_profile(&self, id: &str, owner_id: &str, is_public: bool) -> AppResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO profiles (id, owner_id, is_public, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET owner_id = excluded.owner_id, is_public = excluded.is_public",
            params![id, owner_id, is_public, now_rfc3339()],
        )?;
        Ok(())
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_file_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hackhub.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();

        store.upsert_profile("p1", "owner", true).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_upsert_profile_updates_visibility() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_profile("p1", "owner", true).unwrap();
        store.upsert_profile("p1", "owner", false).unwrap();

        let conn = store.conn.lock();
        let is_public: bool = conn
            .query_row("SELECT is_public FROM profiles WHERE id = 'p1'", [], |row| row.get(0))
            .unwrap();
        assert!(!is_public);
    }
}
