/// Configuration schemas - all config structures defined once with defaults
///
/// Each struct is defined using the config_struct! macro which provides
/// embedded defaults and serde support with `#[serde(default)]`.
use crate::config_struct;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ============================================================================
// WEBSERVER
// ============================================================================

config_struct! {
    /// HTTP listener settings
    pub struct WebserverConfig {
        /// IP to bind: 127.0.0.1 = localhost only, 0.0.0.0 = all interfaces
        host: String = "127.0.0.1".to_string(),
        port: u16 = 8080,
        /// Shared secret for `POST /api/internal/events` (empty = endpoint disabled)
        internal_token: String = String::new(),
    }
}

// ============================================================================
// REALTIME (SSE)
// ============================================================================

config_struct! {
    /// Event stream timing and buffering
    pub struct RealtimeConfig {
        heartbeat_interval_ms: u64 = 30_000,
        /// Hard lifetime of one stream; the server emits `system.timeout` and closes
        connection_ttl_ms: u64 = 3_600_000,
        /// Frames queued per connection before deliveries report backpressure
        client_buffer_size: usize = 256,
    }
}

impl RealtimeConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn connection_ttl(&self) -> Duration {
        Duration::from_millis(self.connection_ttl_ms)
    }
}

// ============================================================================
// STARS
// ============================================================================

config_struct! {
    /// Optimistic star cache and listing limits
    pub struct StarsConfig {
        count_ttl_secs: u64 = 3600,
        flag_ttl_secs: u64 = 3600,
        default_page_size: u64 = 20,
        max_page_size: u64 = 100,
    }
}

impl StarsConfig {
    pub fn count_ttl(&self) -> Duration {
        Duration::from_secs(self.count_ttl_secs)
    }

    pub fn flag_ttl(&self) -> Duration {
        Duration::from_secs(self.flag_ttl_secs)
    }
}

// ============================================================================
// RATE LIMITS
// ============================================================================

/// Quota for one action kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Actions allowed per window
    pub max_actions: u32,
    pub window_secs: u64,
    /// When > 0, exceeding the quota locks the actor out for this long
    #[serde(default)]
    pub lockout_secs: u64,
}

impl RateLimitPolicy {
    pub fn new(max_actions: u32, window_secs: u64, lockout_secs: u64) -> Self {
        Self {
            max_actions,
            window_secs,
            lockout_secs,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn lockout(&self) -> Option<Duration> {
        (self.lockout_secs > 0).then(|| Duration::from_secs(self.lockout_secs))
    }
}

pub const ACTION_PROFILE_STAR: &str = "profile_star";
pub const ACTION_PLATFORM_INVITE: &str = "platform_invite";

fn default_rate_limits() -> HashMap<String, RateLimitPolicy> {
    let mut limits = HashMap::new();
    limits.insert(ACTION_PROFILE_STAR.to_string(), RateLimitPolicy::new(10, 60, 0));
    limits.insert(ACTION_PLATFORM_INVITE.to_string(), RateLimitPolicy::new(5, 60, 900));
    limits
}

// ============================================================================
// STORAGE / CACHE / JOBS / LOGGING
// ============================================================================

config_struct! {
    pub struct DatabaseConfig {
        path: String = "data/hackhub.db".to_string(),
    }
}

config_struct! {
    pub struct CacheSettings {
        /// Maximum entries before least-recently-used eviction
        capacity: usize = 10_000,
    }
}

config_struct! {
    /// Local job runner for queued mutations
    pub struct JobsConfig {
        queue_capacity: usize = 1024,
        max_attempts: u32 = 3,
        retry_backoff_ms: u64 = 500,
    }
}

config_struct! {
    pub struct LoggingConfig {
        /// Threshold; `--verbose` and `--quiet` override it
        level: String = "debug".to_string(),
        file_enabled: bool = true,
        file_path: String = "logs/hackhub.log".to_string(),
    }
}

// ============================================================================
// ROOT
// ============================================================================

config_struct! {
    /// Root configuration loaded from `data/config.toml`
    pub struct Config {
        webserver: WebserverConfig = WebserverConfig::default(),
        realtime: RealtimeConfig = RealtimeConfig::default(),
        stars: StarsConfig = StarsConfig::default(),
        rate_limits: HashMap<String, RateLimitPolicy> = default_rate_limits(),
        database: DatabaseConfig = DatabaseConfig::default(),
        cache: CacheSettings = CacheSettings::default(),
        jobs: JobsConfig = JobsConfig::default(),
        logging: LoggingConfig = LoggingConfig::default(),
    }
}
