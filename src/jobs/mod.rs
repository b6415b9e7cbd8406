//! Queued durable mutations
//!
//! The request path hands a `QueuedMutation` to a `JobQueue` and returns
//! without waiting. `LocalJobRunner` is the in-process queue: a bounded
//! channel drained by one worker task that applies each mutation through a
//! `MutationHandler`, retrying with linear backoff.

pub mod runner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppResult;

pub use runner::{JobMetricsSnapshot, LocalJobRunner};

/// A durable-write intent: action name plus its arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMutation {
    pub name: String,
    pub data: Value,
}

impl QueuedMutation {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Accept a mutation for eventual application. Never waits for it to run;
    /// an error means the mutation was not accepted.
    async fn enqueue(&self, mutation: QueuedMutation) -> AppResult<()>;
}

/// Worker-side application of one mutation
#[async_trait]
pub trait MutationHandler: Send + Sync {
    async fn apply(&self, mutation: &QueuedMutation) -> Result<(), String>;
}
