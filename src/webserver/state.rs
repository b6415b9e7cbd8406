/// Shared application state passed to all route handlers
use std::sync::Arc;

use crate::{
    config::{RealtimeConfig, WebserverConfig},
    identity::IdentityProvider,
    jobs::LocalJobRunner,
    notifications::NotificationService,
    realtime::EventHub,
    stars::StarService,
};

pub struct AppState {
    pub config: WebserverConfig,
    pub realtime: RealtimeConfig,
    pub hub: Arc<EventHub>,
    pub identity: Arc<dyn IdentityProvider>,
    pub stars: Arc<StarService>,
    pub notifications: Arc<NotificationService>,
    /// Present when the in-process runner backs the job queue
    pub jobs: Option<Arc<LocalJobRunner>>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}
