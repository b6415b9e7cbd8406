/// Event taxonomy and SSE wire framing
///
/// Event types are dot-namespaced tags. The enum lists the types this
/// service knows about; the hub itself accepts any well-formed tag so
/// collaborators can extend the taxonomy without touching the transport.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// EVENT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Owned by the transport handler
    SystemConnected,
    SystemHeartbeat,
    SystemTimeout,

    // Application events published by collaborators
    InboxNotificationNew,
    InboxNotificationRead,
    InboxNotificationSync,
    QrStatusUpdate,
    AiChatChunk,
    AiChatComplete,
    AuthTokenRefresh,
    AuthSessionRevoked,
}

impl EventType {
    pub fn code(&self) -> &'static str {
        match self {
            EventType::SystemConnected => "system.connected",
            EventType::SystemHeartbeat => "system.heartbeat",
            EventType::SystemTimeout => "system.timeout",
            EventType::InboxNotificationNew => "inbox.notification.new",
            EventType::InboxNotificationRead => "inbox.notification.read",
            EventType::InboxNotificationSync => "inbox.notification.sync",
            EventType::QrStatusUpdate => "qr.status.update",
            EventType::AiChatChunk => "ai.chat.chunk",
            EventType::AiChatComplete => "ai.chat.complete",
            EventType::AuthTokenRefresh => "auth.token.refresh",
            EventType::AuthSessionRevoked => "auth.session.revoked",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "system.connected" => Some(EventType::SystemConnected),
            "system.heartbeat" => Some(EventType::SystemHeartbeat),
            "system.timeout" => Some(EventType::SystemTimeout),
            "inbox.notification.new" => Some(EventType::InboxNotificationNew),
            "inbox.notification.read" => Some(EventType::InboxNotificationRead),
            "inbox.notification.sync" => Some(EventType::InboxNotificationSync),
            "qr.status.update" => Some(EventType::QrStatusUpdate),
            "ai.chat.chunk" => Some(EventType::AiChatChunk),
            "ai.chat.complete" => Some(EventType::AiChatComplete),
            "auth.token.refresh" => Some(EventType::AuthTokenRefresh),
            "auth.session.revoked" => Some(EventType::AuthSessionRevoked),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// True for types the transport handler emits itself
pub fn is_system_event(event_type: &str) -> bool {
    event_type == "system" || event_type.starts_with("system.")
}

/// Dot-namespaced tag: at least two non-empty segments of `[a-z0-9_]`
///
/// Anything else could break the `event:` line of a frame.
pub fn is_valid_event_type(event_type: &str) -> bool {
    let mut segments = 0;
    for segment in event_type.split('.') {
        if segment.is_empty()
            || !segment
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        {
            return false;
        }
        segments += 1;
    }
    segments >= 2
}

// ============================================================================
// FRAMING
// ============================================================================

/// `event: <type>\ndata: <json>\n\n`
///
/// `Value`'s Display is compact JSON, so the data line never contains a newline.
pub fn format_frame(event_type: &str, payload: &Value) -> String {
    format!("event: {}\ndata: {}\n\n", event_type, payload)
}

/// Payload shared by `system.connected`, `system.heartbeat` and `system.timeout`
pub fn timestamp_payload() -> Value {
    serde_json::json!({ "timestamp": chrono::Utc::now().timestamp_millis() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_is_bit_exact() {
        let frame = format_frame("inbox.notification.new", &json!({"id": 7, "title": "hi"}));
        assert_eq!(
            frame,
            "event: inbox.notification.new\ndata: {\"id\":7,\"title\":\"hi\"}\n\n"
        );
    }

    #[test]
    fn test_multiline_strings_stay_on_one_data_line() {
        let frame = format_frame("ai.chat.chunk", &json!({"text": "a\nb"}));
        assert_eq!(frame.matches('\n').count(), 3);
        assert!(frame.starts_with("event: ai.chat.chunk\ndata: "));
        assert!(frame.ends_with("\n\n"));
    }

    #[test]
    fn test_event_type_codes_round_trip() {
        for kind in [
            EventType::SystemConnected,
            EventType::InboxNotificationRead,
            EventType::QrStatusUpdate,
            EventType::AuthSessionRevoked,
        ] {
            assert_eq!(EventType::from_code(kind.code()), Some(kind));
        }
        assert_eq!(EventType::from_code("custom.thing"), None);
    }

    #[test]
    fn test_event_type_validation() {
        assert!(is_valid_event_type("qr.status.update"));
        assert!(is_valid_event_type("judge_panel.score_2"));
        assert!(!is_valid_event_type("heartbeat"));
        assert!(!is_valid_event_type("inbox..new"));
        assert!(!is_valid_event_type("inbox.New"));
        assert!(!is_valid_event_type("inbox.new\ndata: x"));
        assert!(is_system_event("system.heartbeat"));
        assert!(!is_system_event("systemic.alert"));
    }

    #[test]
    fn test_event_to_frame() {
        let event = Event::of(EventType::SystemHeartbeat, json!({"timestamp": 1}));
        assert_eq!(event.event_type(), "system.heartbeat");
        assert_eq!(event.to_frame(), "event: system.heartbeat\ndata: {\"timestamp\":1}\n\n");
    }
}
