/// In-memory cache with per-key TTL and LRU eviction
///
/// Thread-safe; every operation runs under one lock so `adjust` is a true
/// atomic delta. Uses tokio's clock so paused-time tests can expire entries.
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use super::{CacheError, CacheResult, CacheStore};
use crate::{
    arguments::is_debug_cache_enabled,
    logger::{self, LogTag},
};

/// Cache entry with TTL tracking
struct CacheEntry {
    value: String,
    expires_at: Instant,
    last_accessed: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub inserts: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner {
    data: HashMap<String, CacheEntry>,
    metrics: CacheMetrics,
}

pub struct MemoryCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                data: HashMap::new(),
                metrics: CacheMetrics::default(),
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.lock().metrics.clone()
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let before = inner.data.len();
        inner.data.retain(|_, entry| !entry.is_expired(now));
        let removed = before - inner.data.len();
        inner.metrics.expirations += removed as u64;
        removed
    }

    fn live_entry<'a>(inner: &'a mut Inner, key: &str, now: Instant) -> Option<&'a mut CacheEntry> {
        let expired = inner
            .data
            .get(key)
            .map(|entry| entry.is_expired(now))
            .unwrap_or(false);
        if expired {
            inner.data.remove(key);
            inner.metrics.expirations += 1;
        }
        inner.data.get_mut(key)
    }

    fn insert(inner: &mut Inner, capacity: usize, key: &str, value: String, expires_at: Instant, now: Instant) {
        Self::evict_if_full(inner, capacity, key);
        inner.data.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at,
                last_accessed: now,
            },
        );
        inner.metrics.inserts += 1;
    }

    fn evict_if_full(inner: &mut Inner, capacity: usize, incoming: &str) {
        if inner.data.len() < capacity || inner.data.contains_key(incoming) {
            return;
        }
        let lru_key = inner
            .data
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(k, _)| k.clone());
        if let Some(lru_key) = lru_key {
            inner.data.remove(&lru_key);
            inner.metrics.evictions += 1;
            if is_debug_cache_enabled() {
                logger::debug(LogTag::Cache, &format!("Evicted {}", lru_key));
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let value = Self::live_entry(&mut inner, key, now).map(|entry| {
            entry.last_accessed = now;
            entry.value.clone()
        });
        if value.is_some() {
            inner.metrics.hits += 1;
        } else {
            inner.metrics.misses += 1;
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        Self::insert(&mut inner, self.capacity, key, value, now + ttl, now);
        Ok(())
    }

    async fn swap(&self, key: &str, value: String, ttl: Duration) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let previous = Self::live_entry(&mut inner, key, now).map(|entry| entry.value.clone());
        Self::insert(&mut inner, self.capacity, key, value, now + ttl, now);
        Ok(previous)
    }

    async fn adjust(&self, key: &str, delta: i64) -> CacheResult<Option<i64>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let Some(entry) = Self::live_entry(&mut inner, key, now) else {
            return Ok(None);
        };
        let current: i64 = entry
            .value
            .parse()
            .map_err(|_| CacheError::NotInteger(key.to_string()))?;
        let next = current.saturating_add(delta);
        entry.value = next.to_string();
        entry.last_accessed = now;
        Ok(Some(next))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.inner.lock().data.remove(key);
        Ok(())
    }
}
