//! Profile stars
//!
//! - `service`: star/unstar with permission, quota and duplicate checks,
//!   optimistic cache update and an enqueued durable mutation
//! - `cache`: the best-effort projection (aggregate count, per-actor flag)
//! - `jobs`: mutation names and the worker-side handler
//! - `store`: durable store seam
//! - `types`: response shapes

pub mod cache;
pub mod jobs;
pub mod service;
pub mod store;
pub mod types;

pub use cache::StarCache;
pub use jobs::{StarMutation, StarMutationHandler, STAR_ADD, STAR_REMOVE};
pub use service::StarService;
pub use store::{ProfileRecord, StarRecord, StarStore};
pub use types::{StarOutcome, StarStatus, StarsPage};
