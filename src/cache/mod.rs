//! Key-value cache with per-key TTL and atomic deltas
//!
//! The cache is an accelerator, never a record: callers on the request path
//! log and swallow every `CacheError`.

pub mod memory;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use memory::{CacheMetrics, MemoryCache};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("value at {0} is not an integer")]
    NotInteger(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Live value for `key`, `None` when missing or expired
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Insert or replace with a fresh TTL
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Atomically replace the value and return the previous live one
    async fn swap(&self, key: &str, value: String, ttl: Duration) -> CacheResult<Option<String>>;

    /// Atomically add `delta` to a live integer entry
    ///
    /// The entry keeps the expiry it was written with, so a drifted count is
    /// always recomputed within one TTL. A missing or expired key stays
    /// missing (`Ok(None)`) and the next read-through recomputes it.
    async fn adjust(&self, key: &str, delta: i64) -> CacheResult<Option<i64>>;

    async fn delete(&self, key: &str) -> CacheResult<()>;
}
