/// Star mutations and their worker-side application
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::store::StarStore;
use crate::{
    arguments::is_debug_jobs_enabled,
    jobs::{MutationHandler, QueuedMutation},
    logger::{self, LogTag},
    notifications::NotificationService,
};

pub const STAR_ADD: &str = "profile.star.add";
pub const STAR_REMOVE: &str = "profile.star.remove";

/// Notification kind sent to a profile owner on a new star
pub const NOTIFICATION_KIND_STAR: &str = "profile.star";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StarMutation {
    Add { profile_id: String, actor_id: String },
    Remove { profile_id: String, actor_id: String },
}

impl StarMutation {
    pub fn name(&self) -> &'static str {
        match self {
            StarMutation::Add { .. } => STAR_ADD,
            StarMutation::Remove { .. } => STAR_REMOVE,
        }
    }

    pub fn to_queued(&self) -> QueuedMutation {
        let (StarMutation::Add {
            profile_id,
            actor_id,
        }
        | StarMutation::Remove {
            profile_id,
            actor_id,
        }) = self;
        QueuedMutation::new(
            self.name(),
            json!({
                "profileId": profile_id,
                "actorId": actor_id,
                "requestedAt": chrono::Utc::now().timestamp_millis(),
            }),
        )
    }

    pub fn from_queued(mutation: &QueuedMutation) -> Option<Self> {
        let field = |name: &str| mutation.data.get(name).and_then(Value::as_str).map(str::to_string);
        let profile_id = field("profileId")?;
        let actor_id = field("actorId")?;
        match mutation.name.as_str() {
            STAR_ADD => Some(StarMutation::Add {
                profile_id,
                actor_id,
            }),
            STAR_REMOVE => Some(StarMutation::Remove {
                profile_id,
                actor_id,
            }),
            _ => None,
        }
    }
}

/// Applies star mutations to the durable store and notifies profile owners
pub struct StarMutationHandler {
    store: Arc<dyn StarStore>,
    notifications: Option<Arc<NotificationService>>,
}

impl StarMutationHandler {
    pub fn new(store: Arc<dyn StarStore>, notifications: Option<Arc<NotificationService>>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    async fn notify_owner(&self, profile_id: &str, actor_id: &str) {
        let Some(notifications) = &self.notifications else {
            return;
        };
        let owner = match self.store.profile(profile_id).await {
            Ok(Some(profile)) => profile.owner_id,
            Ok(None) => return,
            Err(e) => {
                logger::warning(LogTag::Jobs, &format!("Owner lookup failed for {}: {}", profile_id, e));
                return;
            }
        };

        let result = notifications
            .create(
                &owner,
                NOTIFICATION_KIND_STAR,
                "Your profile received a new star",
                "",
                json!({ "profileId": profile_id, "actorId": actor_id }),
            )
            .await;
        if let Err(e) = result {
            logger::warning(LogTag::Jobs, &format!("Star notification for {} failed: {}", owner, e));
        }
    }
}

#[async_trait]
impl MutationHandler for StarMutationHandler {
    async fn apply(&self, mutation: &QueuedMutation) -> Result<(), String> {
        let Some(star) = StarMutation::from_queued(mutation) else {
            // Retrying an unparseable mutation cannot help
            logger::warning(
                LogTag::Jobs,
                &format!("Skipping unknown mutation {} ({})", mutation.name, mutation.data),
            );
            return Ok(());
        };

        match star {
            StarMutation::Add {
                profile_id,
                actor_id,
            } => {
                let inserted = self
                    .store
                    .insert_star(&profile_id, &actor_id)
                    .await
                    .map_err(|e| e.to_string())?;
                if is_debug_jobs_enabled() {
                    logger::debug(
                        LogTag::Jobs,
                        &format!("Star {} by {} committed (new={})", profile_id, actor_id, inserted),
                    );
                }
                // A retried insert finds the row and skips the second notification
                if inserted {
                    self.notify_owner(&profile_id, &actor_id).await;
                }
            }
            StarMutation::Remove {
                profile_id,
                actor_id,
            } => {
                let removed = self
                    .store
                    .delete_star(&profile_id, &actor_id)
                    .await
                    .map_err(|e| e.to_string())?;
                if is_debug_jobs_enabled() {
                    logger::debug(
                        LogTag::Jobs,
                        &format!("Unstar {} by {} committed (removed={})", profile_id, actor_id, removed),
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteStore;
    use crate::realtime::EventHub;

    #[test]
    fn test_queued_shape() {
        let queued = StarMutation::Add {
            profile_id: "p1".to_string(),
            actor_id: "alice".to_string(),
        }
        .to_queued();
        assert_eq!(queued.name, "profile.star.add");
        assert_eq!(queued.data["profileId"], "p1");
        assert_eq!(queued.data["actorId"], "alice");

        assert_eq!(
            StarMutation::from_queued(&queued),
            Some(StarMutation::Add {
                profile_id: "p1".to_string(),
                actor_id: "alice".to_string(),
            })
        );
        assert_eq!(
            StarMutation::from_queued(&QueuedMutation::new("other", json!({}))),
            None
        );
    }

    #[tokio::test]
    async fn test_handler_commits_and_notifies_owner_once() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.upsert_profile("p1", "owner", true).unwrap();
        let hub = EventHub::create();
        let notifications = Arc::new(NotificationService::new(store.clone(), store.clone(), hub));
        let handler = StarMutationHandler::new(store.clone(), Some(notifications));

        let add = StarMutation::Add {
            profile_id: "p1".to_string(),
            actor_id: "alice".to_string(),
        }
        .to_queued();
        handler.apply(&add).await.unwrap();
        handler.apply(&add).await.unwrap();

        assert!(store.has_star("p1", "alice").await.unwrap());
        assert_eq!(store.unread_notifications("owner").unwrap(), 1);

        let remove = StarMutation::Remove {
            profile_id: "p1".to_string(),
            actor_id: "alice".to_string(),
        }
        .to_queued();
        handler.apply(&remove).await.unwrap();
        assert_eq!(store.count_stars("p1").await.unwrap(), 0);
    }
}
