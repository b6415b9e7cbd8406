/// Event hub - per-session publish/subscribe registry
///
/// The hub maps a session key to the live subscriptions registered under it
/// (one per open stream, several per key when a user has multiple tabs) and
/// fans published events out to them in registration order.
///
/// Delivery runs under the registry read lock and removal takes the write
/// lock, so once `SubscriptionHandle::unsubscribe` returns, that sink is never
/// invoked again. Sinks must therefore be non-blocking and must not call back
/// into the hub.
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::watch;

use crate::{
    arguments::is_debug_realtime_enabled,
    logger::{self, LogTag},
};

use super::metrics::HubMetrics;

// ============================================================================
// HUB TYPES
// ============================================================================

/// Subscription ID (unique per hub)
pub type SubscriptionId = u64;

/// Why a sink could not take an event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The underlying connection is gone
    #[error("transport closed")]
    Closed,

    /// The client is not draining fast enough
    #[error("client buffer full")]
    Backpressure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("event hub is shut down")]
    ShutDown,
}

/// Delivery callback for one subscription
pub trait EventSink: Send + Sync {
    fn deliver(&self, event_type: &str, payload: &Value) -> Result<(), DeliveryError>;
}

impl<F> EventSink for F
where
    F: Fn(&str, &Value) -> Result<(), DeliveryError> + Send + Sync,
{
    fn deliver(&self, event_type: &str, payload: &Value) -> Result<(), DeliveryError> {
        self(event_type, payload)
    }
}

/// Publishing side of the hub, the seam a distributed backend would replace
pub trait EventPublisher: Send + Sync {
    /// Deliver to every live subscription under `session_key`.
    /// Returns the number of successful deliveries.
    fn publish(&self, session_key: &str, event_type: &str, payload: &Value) -> usize;
}

struct Registration {
    id: SubscriptionId,
    sink: Arc<dyn EventSink>,
}

#[derive(Default)]
struct Registry {
    sessions: HashMap<String, Vec<Registration>>,
    shut_down: bool,
}

// ============================================================================
// EVENT HUB
// ============================================================================

pub struct EventHub {
    registry: RwLock<Registry>,
    next_id: AtomicU64,
    metrics: Arc<HubMetrics>,
    /// Flips to true once on shutdown; open connections watch it
    closing: watch::Sender<bool>,
}

impl EventHub {
    /// Create a hub. One per process, shared by handle.
    pub fn create() -> Arc<Self> {
        Arc::new(Self {
            registry: RwLock::new(Registry::default()),
            next_id: AtomicU64::new(1),
            metrics: HubMetrics::new(),
            closing: watch::channel(false).0,
        })
    }

    /// Register `sink` under `session_key`
    pub fn subscribe(
        self: &Arc<Self>,
        session_key: &str,
        sink: Arc<dyn EventSink>,
    ) -> Result<SubscriptionHandle, HubError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tabs = {
            let mut registry = self.registry.write();
            if registry.shut_down {
                return Err(HubError::ShutDown);
            }
            let entries = registry
                .sessions
                .entry(session_key.to_string())
                .or_default();
            entries.push(Registration { id, sink });
            entries.len()
        };
        self.metrics.subscription_opened();

        if is_debug_realtime_enabled() {
            logger::debug(
                LogTag::Realtime,
                &format!(
                    "EventHub: subscription {} registered for session {} ({} live)",
                    id,
                    short_key(session_key),
                    tabs
                ),
            );
        }

        Ok(SubscriptionHandle {
            hub: Arc::downgrade(self),
            session_key: session_key.to_string(),
            id,
            active: AtomicBool::new(true),
        })
    }

    /// Remove exactly one registration. Returns false if it was already gone.
    fn remove(&self, session_key: &str, id: SubscriptionId) -> bool {
        let removed = {
            let mut registry = self.registry.write();
            let Some(entries) = registry.sessions.get_mut(session_key) else {
                return false;
            };
            let before = entries.len();
            entries.retain(|r| r.id != id);
            let removed = entries.len() < before;
            if entries.is_empty() {
                registry.sessions.remove(session_key);
            }
            removed
        };

        if removed {
            self.metrics.subscriptions_closed(1);
            if is_debug_realtime_enabled() {
                logger::debug(
                    LogTag::Realtime,
                    &format!(
                        "EventHub: subscription {} removed from session {}",
                        id,
                        short_key(session_key)
                    ),
                );
            }
        }
        removed
    }

    /// Fan an event out to every live subscription of `session_key`
    ///
    /// A failing sink is logged and skipped; it stays registered because the
    /// failure may be transient. Closed transports are cleaned up by their
    /// connection handler.
    pub fn publish(&self, session_key: &str, event_type: &str, payload: &Value) -> usize {
        self.metrics.event_published();

        let registry = self.registry.read();
        let Some(entries) = registry.sessions.get(session_key) else {
            self.metrics.event_unrouted();
            if is_debug_realtime_enabled() {
                logger::debug(
                    LogTag::Realtime,
                    &format!(
                        "EventHub: {} dropped, no subscription for session {}",
                        event_type,
                        short_key(session_key)
                    ),
                );
            }
            return 0;
        };

        let mut delivered = 0;
        for registration in entries {
            match registration.sink.deliver(event_type, payload) {
                Ok(()) => {
                    delivered += 1;
                    self.metrics.delivered();
                }
                Err(e) => {
                    self.metrics.delivery_failed();
                    logger::warning(
                        LogTag::Realtime,
                        &format!(
                            "EventHub: delivery of {} to subscription {} failed: {}",
                            event_type, registration.id, e
                        ),
                    );
                }
            }
        }
        delivered
    }

    /// Drop every registration and refuse new ones. Idempotent.
    pub fn shutdown(&self) {
        let cleared = {
            let mut registry = self.registry.write();
            if registry.shut_down {
                return;
            }
            registry.shut_down = true;
            let count = registry.sessions.values().map(Vec::len).sum::<usize>();
            registry.sessions.clear();
            count
        };
        if cleared > 0 {
            self.metrics.subscriptions_closed(cleared);
        }
        self.closing.send_replace(true);
        logger::info(
            LogTag::Realtime,
            &format!("EventHub shut down ({} subscriptions dropped)", cleared),
        );
    }

    /// Resolves `changed()` when the hub shuts down
    pub fn closing_signal(&self) -> watch::Receiver<bool> {
        self.closing.subscribe()
    }

    pub fn is_shut_down(&self) -> bool {
        self.registry.read().shut_down
    }

    /// Live subscriptions for one session key
    pub fn subscription_count(&self, session_key: &str) -> usize {
        self.registry
            .read()
            .sessions
            .get(session_key)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Live subscriptions across all sessions
    pub fn active_subscriptions(&self) -> usize {
        self.registry.read().sessions.values().map(Vec::len).sum()
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        self.metrics.clone()
    }
}

impl EventPublisher for EventHub {
    fn publish(&self, session_key: &str, event_type: &str, payload: &Value) -> usize {
        EventHub::publish(self, session_key, event_type, payload)
    }
}

// ============================================================================
// SUBSCRIPTION HANDLE
// ============================================================================

/// Removes exactly one registration, at most once
///
/// Dropping the handle unsubscribes too.
pub struct SubscriptionHandle {
    hub: Weak<EventHub>,
    session_key: String,
    id: SubscriptionId,
    active: AtomicBool,
}

impl SubscriptionHandle {
    /// Returns true only for the call that actually removed the registration
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        match self.hub.upgrade() {
            Some(hub) => hub.remove(&self.session_key, self.id),
            None => false,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Session keys are credentials; only a prefix goes to the logs
pub(crate) fn short_key(session_key: &str) -> &str {
    match session_key.char_indices().nth(8) {
        Some((idx, _)) => &session_key[..idx],
        None => session_key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    type Log = Arc<Mutex<Vec<(String, Value)>>>;

    fn recording_sink() -> (Arc<dyn EventSink>, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = log.clone();
        let sink = move |event_type: &str, payload: &Value| -> Result<(), DeliveryError> {
            sink_log.lock().push((event_type.to_string(), payload.clone()));
            Ok(())
        };
        (Arc::new(sink), log)
    }

    #[test]
    fn test_sessions_are_isolated() {
        let hub = EventHub::create();
        let (sink_a, log_a) = recording_sink();
        let (sink_b, log_b) = recording_sink();
        let _a = hub.subscribe("session-a", sink_a).unwrap();
        let _b = hub.subscribe("session-b", sink_b).unwrap();

        let delivered = hub.publish("session-a", "inbox.notification.new", &json!({"id": 1}));

        assert_eq!(delivered, 1);
        assert_eq!(log_a.lock().len(), 1);
        assert!(log_b.lock().is_empty());
    }

    #[test]
    fn test_multi_tab_fan_out_exactly_once() {
        let hub = EventHub::create();
        let (tab1, log1) = recording_sink();
        let (tab2, log2) = recording_sink();
        let _h1 = hub.subscribe("session", tab1).unwrap();
        let _h2 = hub.subscribe("session", tab2).unwrap();

        assert_eq!(hub.publish("session", "qr.status.update", &json!({"ok": true})), 2);
        assert_eq!(log1.lock().len(), 1);
        assert_eq!(log2.lock().len(), 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent_and_scoped() {
        let hub = EventHub::create();
        let (tab1, log1) = recording_sink();
        let (tab2, log2) = recording_sink();
        let h1 = hub.subscribe("session", tab1).unwrap();
        let _h2 = hub.subscribe("session", tab2).unwrap();

        assert!(h1.unsubscribe());
        assert!(!h1.unsubscribe());
        assert_eq!(hub.subscription_count("session"), 1);

        hub.publish("session", "ai.chat.chunk", &json!({"text": "x"}));
        assert!(log1.lock().is_empty());
        assert_eq!(log2.lock().len(), 1);
    }

    #[test]
    fn test_delivery_preserves_publish_order() {
        let hub = EventHub::create();
        let (sink, log) = recording_sink();
        let _h = hub.subscribe("session", sink).unwrap();

        hub.publish("session", "ai.chat.chunk", &json!({"n": 1}));
        hub.publish("session", "ai.chat.complete", &json!({"n": 2}));

        let log = log.lock();
        assert_eq!(log[0].0, "ai.chat.chunk");
        assert_eq!(log[1].0, "ai.chat.complete");
    }

    #[test]
    fn test_failing_sink_does_not_block_others_and_stays_registered() {
        let hub = EventHub::create();
        let failing = |_: &str, _: &Value| -> Result<(), DeliveryError> {
            Err(DeliveryError::Backpressure)
        };
        let (healthy, log) = recording_sink();
        let _f = hub.subscribe("session", Arc::new(failing)).unwrap();
        let _h = hub.subscribe("session", healthy).unwrap();

        assert_eq!(hub.publish("session", "inbox.notification.new", &json!({})), 1);
        assert_eq!(log.lock().len(), 1);
        assert_eq!(hub.subscription_count("session"), 2);
        assert_eq!(hub.metrics().snapshot().delivery_failures, 1);
    }

    #[test]
    fn test_publish_without_subscribers_is_lost() {
        let hub = EventHub::create();
        assert_eq!(hub.publish("nobody", "inbox.notification.new", &json!({})), 0);
        assert_eq!(hub.metrics().snapshot().events_unrouted, 1);
    }

    #[test]
    fn test_dropping_handle_unsubscribes() {
        let hub = EventHub::create();
        let (sink, _log) = recording_sink();
        {
            let _handle = hub.subscribe("session", sink).unwrap();
            assert_eq!(hub.subscription_count("session"), 1);
        }
        assert_eq!(hub.subscription_count("session"), 0);
        assert_eq!(hub.active_subscriptions(), 0);
    }

    #[test]
    fn test_shutdown_clears_and_refuses() {
        let hub = EventHub::create();
        let (sink, log) = recording_sink();
        let handle = hub.subscribe("session", sink.clone()).unwrap();

        hub.shutdown();

        assert!(hub.is_shut_down());
        assert_eq!(hub.publish("session", "inbox.notification.new", &json!({})), 0);
        assert!(log.lock().is_empty());
        assert!(matches!(hub.subscribe("session", sink), Err(HubError::ShutDown)));
        assert!(!handle.unsubscribe());
        assert_eq!(hub.metrics().snapshot().active_subscriptions, 0);
    }

    #[test]
    fn test_short_key_truncates() {
        assert_eq!(short_key("abcdefghijkl"), "abcdefgh");
        assert_eq!(short_key("abc"), "abc");
    }
}
