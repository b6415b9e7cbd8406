/// Optimistic star projection
///
/// Two scalar facts are cached per profile: the aggregate star count and each
/// actor's has-starred flag. Every failure is logged and swallowed here, so
/// callers only ever see "hit" or "miss".
use std::sync::Arc;
use std::time::Duration;

use crate::{
    arguments::is_debug_cache_enabled,
    cache::CacheStore,
    config::StarsConfig,
    logger::{self, LogTag},
};

pub fn count_key(profile_id: &str) -> String {
    format!("profile:{}:star_count", profile_id)
}

pub fn flag_key(profile_id: &str, actor_id: &str) -> String {
    format!("profile:{}:starred_by:{}", profile_id, actor_id)
}

fn flag_raw(starred: bool) -> String {
    let raw = if starred { "1" } else { "0" };
    raw.to_string()
}

fn flag_value(raw: &str) -> bool {
    raw == "1"
}

pub struct StarCache {
    cache: Arc<dyn CacheStore>,
    count_ttl: Duration,
    flag_ttl: Duration,
}

impl StarCache {
    pub fn new(cache: Arc<dyn CacheStore>, config: &StarsConfig) -> Self {
        Self {
            cache,
            count_ttl: config.count_ttl(),
            flag_ttl: config.flag_ttl(),
        }
    }

    pub async fn count(&self, profile_id: &str) -> Option<u64> {
        let key = count_key(profile_id);
        match self.cache.get(&key).await {
            Ok(Some(raw)) => match raw.parse::<i64>() {
                Ok(value) => Some(value.max(0) as u64),
                Err(_) => {
                    logger::warning(LogTag::Cache, &format!("Discarding malformed count at {}", key));
                    self.delete(&key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                logger::warning(LogTag::Cache, &format!("Count read failed for {}: {}", key, e));
                None
            }
        }
    }

    pub async fn set_count(&self, profile_id: &str, count: u64) {
        let key = count_key(profile_id);
        if let Err(e) = self.cache.set(&key, count.to_string(), self.count_ttl).await {
            logger::warning(LogTag::Cache, &format!("Count write failed for {}: {}", key, e));
        }
    }

    /// Atomic delta on a live count; `None` on miss or failure
    pub async fn adjust_count(&self, profile_id: &str, delta: i64) -> Option<u64> {
        let key = count_key(profile_id);
        match self.cache.adjust(&key, delta).await {
            Ok(Some(value)) => Some(value.max(0) as u64),
            Ok(None) => {
                if is_debug_cache_enabled() {
                    logger::debug(LogTag::Cache, &format!("No live count at {}, left for read-through", key));
                }
                None
            }
            Err(e) => {
                logger::warning(LogTag::Cache, &format!("Count adjust failed for {}: {}", key, e));
                None
            }
        }
    }

    pub async fn flag(&self, profile_id: &str, actor_id: &str) -> Option<bool> {
        let key = flag_key(profile_id, actor_id);
        match self.cache.get(&key).await {
            Ok(Some(raw)) => Some(flag_value(&raw)),
            Ok(None) => None,
            Err(e) => {
                logger::warning(LogTag::Cache, &format!("Flag read failed for {}: {}", key, e));
                None
            }
        }
    }

    pub async fn set_flag(&self, profile_id: &str, actor_id: &str, starred: bool) {
        let key = flag_key(profile_id, actor_id);
        if let Err(e) = self.cache.set(&key, flag_raw(starred), self.flag_ttl).await {
            logger::warning(LogTag::Cache, &format!("Flag write failed for {}: {}", key, e));
        }
    }

    /// Write the flag and return what it held before
    ///
    /// Concurrent writers of the same value see each other: exactly one of
    /// them observes the flag change. `None` on miss or failure.
    pub async fn swap_flag(&self, profile_id: &str, actor_id: &str, starred: bool) -> Option<bool> {
        let key = flag_key(profile_id, actor_id);
        match self.cache.swap(&key, flag_raw(starred), self.flag_ttl).await {
            Ok(previous) => previous.map(|raw| flag_value(&raw)),
            Err(e) => {
                logger::warning(LogTag::Cache, &format!("Flag swap failed for {}: {}", key, e));
                None
            }
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            logger::warning(LogTag::Cache, &format!("Delete failed for {}: {}", key, e));
        }
    }
}
