//! Inbox notifications
//!
//! Rows live in the durable store; every change is pushed to the recipient's
//! live sessions. Payloads carry the signed delta and the authoritative
//! `unreadCount`, so a client that missed an event corrects itself on the
//! next one (and on reconnect, via `inbox.notification.sync`).

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    arguments::is_debug_notifications_enabled,
    database::{NotificationRecord, SqliteStore},
    errors::AppResult,
    identity::IdentityProvider,
    logger::{self, LogTag},
    pagination::PageRequest,
    realtime::{EventPublisher, EventType},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub rows: Vec<NotificationRecord>,
    pub total: u64,
    pub unread_count: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_more: bool,
}

pub struct NotificationService {
    store: Arc<SqliteStore>,
    identity: Arc<dyn IdentityProvider>,
    publisher: Arc<dyn EventPublisher>,
}

impl NotificationService {
    pub fn new(
        store: Arc<SqliteStore>,
        identity: Arc<dyn IdentityProvider>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            identity,
            publisher,
        }
    }

    /// Store a notification and push `inbox.notification.new` to the user
    pub async fn create(
        &self,
        user_id: &str,
        kind: &str,
        title: &str,
        body: &str,
        data: Value,
    ) -> AppResult<NotificationRecord> {
        let record = self.store.insert_notification(user_id, kind, title, body, &data)?;
        let unread = self.store.unread_notifications(user_id)?;

        let payload = json!({
            "notification": record,
            "delta": 1,
            "unreadCount": unread,
        });
        self.push(user_id, EventType::InboxNotificationNew, &payload).await;

        logger::info(
            LogTag::Notifications,
            &format!("Notification {} ({}) for {}", record.id, kind, user_id),
        );
        Ok(record)
    }

    pub fn list(&self, user_id: &str, page: PageRequest) -> AppResult<NotificationPage> {
        let rows = self.store.list_notifications(user_id, page.offset, page.limit)?;
        let total = self.store.count_notifications(user_id)?;
        let unread_count = self.store.unread_notifications(user_id)?;
        Ok(NotificationPage {
            has_more: page.has_more(rows.len(), total),
            rows,
            total,
            unread_count,
            offset: page.offset,
            limit: page.limit,
        })
    }

    /// Mark `ids` read (all unread when empty); returns the new unread count
    pub async fn mark_read(&self, user_id: &str, ids: &[i64]) -> AppResult<u64> {
        let changed = self.store.mark_notifications_read(user_id, ids)?;
        let unread = self.store.unread_notifications(user_id)?;

        if changed > 0 {
            let payload = json!({
                "ids": ids,
                "delta": -(changed as i64),
                "unreadCount": unread,
            });
            self.push(user_id, EventType::InboxNotificationRead, &payload).await;
        }
        Ok(unread)
    }

    pub fn unread_count(&self, user_id: &str) -> AppResult<u64> {
        self.store.unread_notifications(user_id)
    }

    /// Fan out to every live session of the user. Delivery is best effort.
    async fn push(&self, user_id: &str, event: EventType, payload: &Value) {
        let sessions = match self.identity.sessions_for_user(user_id).await {
            Ok(sessions) => sessions,
            Err(e) => {
                logger::warning(
                    LogTag::Notifications,
                    &format!("Could not resolve sessions for {}: {}", user_id, e),
                );
                return;
            }
        };

        let mut delivered = 0;
        for session_key in &sessions {
            delivered += self.publisher.publish(session_key, event.code(), payload);
        }

        if is_debug_notifications_enabled() {
            logger::debug(
                LogTag::Notifications,
                &format!(
                    "{} to {}: {} sessions, {} deliveries",
                    event.code(),
                    user_id,
                    sessions.len(),
                    delivered
                ),
            );
        }
    }
}
