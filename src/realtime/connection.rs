/// SSE connection lifecycle
///
/// One `SseConnection` bridges one long-lived client stream to the event hub:
///
/// ```text
/// Handshaking --auth ok--> Streaming --client gone--> ClosedByClient
///      |                       |
///      +--auth failed--> Rejected   +--ttl elapsed--> ClosedByTimeout
/// ```
///
/// Handshaking and Rejected happen in the route before a connection exists.
/// Frames travel through a bounded channel whose receiver is the response
/// body; the hub sink, heartbeats and the timeout notice all write into it.
/// Every terminal path funnels into `teardown`, which runs at most once.
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{
    arguments::is_debug_realtime_enabled,
    config::RealtimeConfig,
    logger::{self, LogTag},
};

use super::event::{format_frame, timestamp_payload, EventType};
use super::hub::{short_key, DeliveryError, EventHub, EventSink, HubError, SubscriptionHandle};

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Handshaking,
    Streaming,
    ClosedByClient,
    ClosedByTimeout,
    /// The hub shut down under an open stream
    ClosedByShutdown,
    Rejected,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionState::ClosedByClient
                | ConnectionState::ClosedByTimeout
                | ConnectionState::ClosedByShutdown
                | ConnectionState::Rejected
        )
    }
}

/// Heartbeat cadence and hard lifetime of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTiming {
    pub heartbeat: Duration,
    pub ttl: Duration,
}

impl From<&RealtimeConfig> for StreamTiming {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            heartbeat: config.heartbeat_interval(),
            ttl: config.connection_ttl(),
        }
    }
}

impl Default for StreamTiming {
    fn default() -> Self {
        Self::from(&RealtimeConfig::default())
    }
}

// ============================================================================
// CHANNEL SINK
// ============================================================================

/// Hub sink that frames events into the connection's channel without blocking
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, event_type: &str, payload: &Value) -> Result<(), DeliveryError> {
        self.tx
            .try_send(format_frame(event_type, payload))
            .map_err(|e| match e {
                TrySendError::Full(_) => DeliveryError::Backpressure,
                TrySendError::Closed(_) => DeliveryError::Closed,
            })
    }
}

// ============================================================================
// CONNECTION
// ============================================================================

/// Receiving half handed to the HTTP layer plus the connection driving it
pub struct OpenedStream {
    pub frames: mpsc::Receiver<String>,
    pub connection: Arc<SseConnection>,
}

pub struct SseConnection {
    id: String,
    session_key: String,
    timing: StreamTiming,
    /// Taken on teardown; once every sender is gone the body stream ends
    tx: Mutex<Option<mpsc::Sender<String>>>,
    subscription: SubscriptionHandle,
    closing: watch::Receiver<bool>,
    state: Mutex<ConnectionState>,
}

impl SseConnection {
    /// Open a stream for an already-authenticated session
    ///
    /// Queues `system.connected` and then any `initial` frames before the hub
    /// subscription exists, so they precede every hub-driven event.
    pub fn open(
        hub: &Arc<EventHub>,
        session_key: &str,
        timing: StreamTiming,
        buffer_size: usize,
        initial: Vec<(EventType, Value)>,
    ) -> Result<OpenedStream, HubError> {
        let capacity = buffer_size.max(initial.len() + 2);
        let (tx, rx) = mpsc::channel(capacity);

        let connected = format_frame(EventType::SystemConnected.code(), &timestamp_payload());
        let mut queued = vec![connected];
        queued.extend(
            initial
                .iter()
                .map(|(kind, payload)| format_frame(kind.code(), payload)),
        );
        for frame in queued {
            // Fresh channel with room for every initial frame
            if tx.try_send(frame).is_err() {
                logger::warning(LogTag::Realtime, "Initial frame could not be queued");
            }
        }

        let closing = hub.closing_signal();
        let subscription = hub.subscribe(session_key, Arc::new(ChannelSink::new(tx.clone())))?;

        let connection = Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_key: session_key.to_string(),
            timing,
            tx: Mutex::new(Some(tx)),
            subscription,
            closing,
            state: Mutex::new(ConnectionState::Streaming),
        });

        if is_debug_realtime_enabled() {
            logger::debug(
                LogTag::Realtime,
                &format!(
                    "Connection {} streaming for session {}",
                    connection.id,
                    short_key(session_key)
                ),
            );
        }

        Ok(OpenedStream {
            frames: rx,
            connection,
        })
    }

    /// Drive heartbeats and the TTL until the stream ends
    ///
    /// Returns the terminal state that ended it.
    pub async fn run(self: Arc<Self>) -> ConnectionState {
        // Held only to observe the receiver going away
        let Some(watch) = self.tx.lock().clone() else {
            return self.state();
        };

        let start = Instant::now();
        let mut heartbeat = time::interval_at(start + self.timing.heartbeat, self.timing.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ttl = time::sleep_until(start + self.timing.ttl);
        tokio::pin!(ttl);
        let mut closing = self.closing.clone();
        if *closing.borrow() {
            self.teardown(ConnectionState::ClosedByShutdown);
            return self.state();
        }

        let reason = loop {
            tokio::select! {
                biased;

                _ = watch.closed() => break ConnectionState::ClosedByClient,

                _ = closing.changed() => break ConnectionState::ClosedByShutdown,

                _ = &mut ttl => break ConnectionState::ClosedByTimeout,

                _ = heartbeat.tick() => {
                    match self.write(EventType::SystemHeartbeat, &timestamp_payload()) {
                        Ok(()) => {}
                        Err(DeliveryError::Closed) => break ConnectionState::ClosedByClient,
                        Err(DeliveryError::Backpressure) => {
                            logger::warning(
                                LogTag::Realtime,
                                &format!("Connection {}: heartbeat skipped (client buffer full)", self.id),
                            );
                        }
                    }
                }
            }
        };

        // Leaving the loop cancelled both timers
        self.teardown(reason);
        drop(watch);
        self.state()
    }

    /// Single idempotent exit for every terminal transition
    ///
    /// Returns false when another path already tore the connection down.
    pub fn teardown(&self, reason: ConnectionState) -> bool {
        {
            let mut state = self.state.lock();
            if state.is_terminal() {
                return false;
            }
            *state = reason;
        }

        self.subscription.unsubscribe();

        let tx = self.tx.lock().take();
        if reason == ConnectionState::ClosedByTimeout {
            if let Some(tx) = tx.as_ref() {
                let frame = format_frame(EventType::SystemTimeout.code(), &timestamp_payload());
                if let Err(e) = tx.try_send(frame) {
                    logger::warning(
                        LogTag::Realtime,
                        &format!("Connection {}: timeout notice not sent: {}", self.id, e),
                    );
                }
            }
        }
        drop(tx);

        if is_debug_realtime_enabled() {
            logger::debug(
                LogTag::Realtime,
                &format!(
                    "Connection {} for session {} closed ({:?})",
                    self.id,
                    short_key(&self.session_key),
                    reason
                ),
            );
        }
        true
    }

    fn write(&self, kind: EventType, payload: &Value) -> Result<(), DeliveryError> {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(DeliveryError::Closed);
        };
        ChannelSink::new(tx.clone()).deliver(kind.code(), payload)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }
}

impl Drop for SseConnection {
    fn drop(&mut self) {
        self.teardown(ConnectionState::ClosedByClient);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timing(heartbeat_secs: u64, ttl_secs: u64) -> StreamTiming {
        StreamTiming {
            heartbeat: Duration::from_secs(heartbeat_secs),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    fn event_name(frame: &str) -> &str {
        frame
            .strip_prefix("event: ")
            .and_then(|rest| rest.split('\n').next())
            .unwrap_or("")
    }

    #[tokio::test]
    async fn test_connected_frame_precedes_same_tick_publish() {
        let hub = EventHub::create();
        let mut opened =
            SseConnection::open(&hub, "session", StreamTiming::default(), 16, vec![]).unwrap();

        hub.publish("session", "inbox.notification.new", &json!({"id": 1}));

        let first = opened.frames.recv().await.unwrap();
        let second = opened.frames.recv().await.unwrap();
        assert_eq!(event_name(&first), "system.connected");
        assert!(first.contains("\"timestamp\":"));
        assert_eq!(second, "event: inbox.notification.new\ndata: {\"id\":1}\n\n");
    }

    #[tokio::test]
    async fn test_initial_frames_follow_connected() {
        let hub = EventHub::create();
        let mut opened = SseConnection::open(
            &hub,
            "session",
            StreamTiming::default(),
            16,
            vec![(EventType::InboxNotificationSync, json!({"unreadCount": 3}))],
        )
        .unwrap();

        hub.publish("session", "qr.status.update", &json!({}));

        let frames: Vec<String> = vec![
            opened.frames.recv().await.unwrap(),
            opened.frames.recv().await.unwrap(),
            opened.frames.recv().await.unwrap(),
        ];
        assert_eq!(event_name(&frames[0]), "system.connected");
        assert_eq!(
            frames[1],
            "event: inbox.notification.sync\ndata: {\"unreadCount\":3}\n\n"
        );
        assert_eq!(event_name(&frames[2]), "qr.status.update");
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_cadence_over_65_seconds() {
        let hub = EventHub::create();
        let opened =
            SseConnection::open(&hub, "session", StreamTiming::default(), 64, vec![]).unwrap();
        let mut rx = opened.frames;
        tokio::spawn(opened.connection.run());

        let mut frames = Vec::new();
        let _ = time::timeout(Duration::from_secs(65), async {
            while let Some(frame) = rx.recv().await {
                frames.push(frame);
            }
        })
        .await;

        let names: Vec<&str> = frames.iter().map(|f| event_name(f)).collect();
        assert_eq!(
            names,
            vec!["system.connected", "system.heartbeat", "system.heartbeat"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_closes_with_timeout_frame() {
        let hub = EventHub::create();
        let opened = SseConnection::open(&hub, "session", timing(30, 100), 64, vec![]).unwrap();
        let mut rx = opened.frames;
        let connection = opened.connection.clone();
        let task = tokio::spawn(opened.connection.run());

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }

        let names: Vec<&str> = frames.iter().map(|f| event_name(f)).collect();
        assert_eq!(
            names,
            vec![
                "system.connected",
                "system.heartbeat",
                "system.heartbeat",
                "system.heartbeat",
                "system.timeout",
            ]
        );
        assert_eq!(task.await.unwrap(), ConnectionState::ClosedByTimeout);
        assert_eq!(connection.state(), ConnectionState::ClosedByTimeout);
        assert_eq!(hub.subscription_count("session"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_disconnect_unsubscribes() {
        let hub = EventHub::create();
        let opened =
            SseConnection::open(&hub, "session", StreamTiming::default(), 16, vec![]).unwrap();
        let task = tokio::spawn(opened.connection.run());
        assert_eq!(hub.subscription_count("session"), 1);

        drop(opened.frames);

        assert_eq!(task.await.unwrap(), ConnectionState::ClosedByClient);
        assert_eq!(hub.subscription_count("session"), 0);
    }

    #[tokio::test]
    async fn test_teardown_runs_once_when_both_paths_fire() {
        let hub = EventHub::create();
        let mut opened =
            SseConnection::open(&hub, "session", StreamTiming::default(), 16, vec![]).unwrap();
        let connection = opened.connection.clone();

        assert!(connection.teardown(ConnectionState::ClosedByTimeout));
        assert!(!connection.teardown(ConnectionState::ClosedByClient));
        assert_eq!(connection.state(), ConnectionState::ClosedByTimeout);
        assert_eq!(hub.subscription_count("session"), 0);

        // connected, timeout, then the stream ends once the last sender is gone
        assert_eq!(event_name(&opened.frames.recv().await.unwrap()), "system.connected");
        assert_eq!(event_name(&opened.frames.recv().await.unwrap()), "system.timeout");
        drop(opened.connection);
        drop(connection);
        assert!(opened.frames.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_tabs_close_independently() {
        let hub = EventHub::create();
        let mut tab1 =
            SseConnection::open(&hub, "session", StreamTiming::default(), 16, vec![]).unwrap();
        let mut tab2 =
            SseConnection::open(&hub, "session", StreamTiming::default(), 16, vec![]).unwrap();

        tab1.connection.teardown(ConnectionState::ClosedByClient);
        assert_eq!(hub.publish("session", "auth.token.refresh", &json!({})), 1);

        tab1.frames.recv().await.unwrap(); // connected
        tab2.frames.recv().await.unwrap(); // connected
        assert_eq!(
            event_name(&tab2.frames.recv().await.unwrap()),
            "auth.token.refresh"
        );
        drop(tab1.connection);
        assert!(tab1.frames.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hub_shutdown_ends_open_streams() {
        let hub = EventHub::create();
        let opened =
            SseConnection::open(&hub, "session", StreamTiming::default(), 16, vec![]).unwrap();
        let mut rx = opened.frames;
        let task = tokio::spawn(opened.connection.run());

        assert_eq!(event_name(&rx.recv().await.unwrap()), "system.connected");
        hub.shutdown();

        assert_eq!(task.await.unwrap(), ConnectionState::ClosedByShutdown);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_open_after_shutdown_is_refused() {
        let hub = EventHub::create();
        hub.shutdown();
        let result = SseConnection::open(&hub, "session", StreamTiming::default(), 16, vec![]);
        assert!(matches!(result, Err(HubError::ShutDown)));
    }
}
