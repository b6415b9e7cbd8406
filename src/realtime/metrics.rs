use serde::Serialize;
/// Event hub metrics
///
/// Aggregate counters across every subscription, exposed on the status route.
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Hub-level metrics (thread-safe)
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Total subscriptions (lifetime)
    subscriptions_opened: AtomicU64,

    /// Total subscriptions removed (unsubscribe or shutdown)
    subscriptions_closed: AtomicU64,

    /// Current live subscriptions
    active_subscriptions: AtomicUsize,

    /// Publish calls
    events_published: AtomicU64,

    /// Successful callback invocations
    deliveries: AtomicU64,

    /// Callbacks that reported a failure
    delivery_failures: AtomicU64,

    /// Publishes that found no subscription for their session
    events_unrouted: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscription_opened(&self) {
        self.subscriptions_opened.fetch_add(1, Ordering::Relaxed);
        self.active_subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriptions_closed(&self, count: usize) {
        self.subscriptions_closed
            .fetch_add(count as u64, Ordering::Relaxed);
        self.active_subscriptions.fetch_sub(count, Ordering::Relaxed);
    }

    pub fn event_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivery_failed(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_unrouted(&self) {
        self.events_unrouted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            subscriptions_opened: self.subscriptions_opened.load(Ordering::Relaxed),
            subscriptions_closed: self.subscriptions_closed.load(Ordering::Relaxed),
            active_subscriptions: self.active_subscriptions.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            events_unrouted: self.events_unrouted.load(Ordering::Relaxed),
        }
    }
}

/// Hub metrics snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubMetricsSnapshot {
    pub subscriptions_opened: u64,
    pub subscriptions_closed: u64,
    pub active_subscriptions: usize,
    pub events_published: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
    pub events_unrouted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_metrics() {
        let metrics = HubMetrics::new();

        metrics.subscription_opened();
        metrics.subscription_opened();
        metrics.subscription_opened();
        metrics.event_published();
        metrics.delivered();
        metrics.delivered();
        metrics.delivery_failed();
        metrics.subscriptions_closed(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.subscriptions_opened, 3);
        assert_eq!(snapshot.subscriptions_closed, 2);
        assert_eq!(snapshot.active_subscriptions, 1);
        assert_eq!(snapshot.events_published, 1);
        assert_eq!(snapshot.deliveries, 2);
        assert_eq!(snapshot.delivery_failures, 1);
    }
}
