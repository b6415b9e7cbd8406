use rusqlite::{params, Row};
use serde::Serialize;
use serde_json::Value;

use super::{now_rfc3339, SqliteStore};
use crate::errors::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: i64,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub data: Value,
    pub is_read: bool,
    pub created_at: String,
}

impl NotificationRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let data: String = row.get(5)?;
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            title: row.get(3)?,
            body: row.get(4)?,
            data: serde_json::from_str(&data).unwrap_or(Value::Null),
            is_read: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl SqliteStore {
    pub fn insert_notification(
        &self,
        user_id: &str,
        kind: &str,
        title: &str,
        body: &str,
        data: &Value,
    ) -> AppResult<NotificationRecord> {
        let created_at = now_rfc3339();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO notifications (user_id, kind, title, body, data, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![user_id, kind, title, body, data.to_string(), created_at],
        )?;
        Ok(NotificationRecord {
            id: conn.last_insert_rowid(),
            user_id: user_id.to_string(),
            kind: kind.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            data: data.clone(),
            is_read: false,
            created_at,
        })
    }

    /// Newest first
    pub fn list_notifications(
        &self,
        user_id: &str,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<NotificationRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, kind, title, body, data, is_read, created_at
             FROM notifications WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit as i64, offset as i64], NotificationRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_notifications(&self, user_id: &str) -> AppResult<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    pub fn unread_notifications(&self, user_id: &str) -> AppResult<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Mark the given ids (or every unread row when `ids` is empty) as read.
    /// Returns how many rows flipped from unread to read.
    pub fn mark_notifications_read(&self, user_id: &str, ids: &[i64]) -> AppResult<u64> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut changed = 0usize;
        if ids.is_empty() {
            changed = tx.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                params![user_id],
            )?;
        } else {
            for id in ids {
                changed += tx.execute(
                    "UPDATE notifications SET is_read = 1
                     WHERE user_id = ?1 AND id = ?2 AND is_read = 0",
                    params![user_id, id],
                )?;
            }
        }
        tx.commit()?;
        Ok(changed as u64)
    }
}
