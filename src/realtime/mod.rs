//! Real-time event delivery
//!
//! - `event`: event taxonomy and the `event:/data:` SSE framing
//! - `hub`: per-session publish/subscribe registry with idempotent unsubscribe
//! - `connection`: one SSE stream's lifecycle (heartbeat, TTL, teardown)
//! - `metrics`: hub counters for the status endpoint
pub mod connection;
pub mod event;
pub mod hub;
pub mod metrics;

pub use connection::{ConnectionState, OpenedStream, SseConnection, StreamTiming};
pub use event::{format_frame, is_system_event, is_valid_event_type, EventType};
pub use hub::{
    DeliveryError, EventHub, EventPublisher, EventSink, HubError, SubscriptionHandle,
    SubscriptionId,
};
pub use metrics::{HubMetrics, HubMetricsSnapshot};
