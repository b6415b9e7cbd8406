/// SSE stream endpoint
///
/// Handshaking happens in the `AuthSession` extractor: a missing or unknown
/// session is rejected with 401 before any stream exists. On success the
/// response headers go out with a body fed by the connection's channel, and
/// the connection task drives heartbeats and the TTL.
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::stream;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

use crate::{
    arguments::is_debug_realtime_enabled,
    errors::AppError,
    logger::{self, LogTag},
    realtime::{EventType, SseConnection, StreamTiming},
    webserver::{auth::AuthSession, state::AppState},
};

/// Tells nginx-style proxies not to buffer the stream
const X_ACCEL_BUFFERING: &str = "x-accel-buffering";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/stream", get(open_stream))
}

/// GET /api/stream
async fn open_stream(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
) -> Result<Response, AppError> {
    // Authoritative unread count so clients never fold deltas across a gap
    let mut initial = Vec::new();
    match state.notifications.unread_count(&session.user_id) {
        Ok(unread) => initial.push((
            EventType::InboxNotificationSync,
            json!({
                "unreadCount": unread,
                "timestamp": chrono::Utc::now().timestamp_millis(),
            }),
        )),
        Err(e) => logger::warning(
            LogTag::Realtime,
            &format!("Unread count unavailable for stream resync: {}", e),
        ),
    }

    let opened = SseConnection::open(
        &state.hub,
        &session.session_key,
        StreamTiming::from(&state.realtime),
        state.realtime.client_buffer_size,
        initial,
    )
    .map_err(|e| AppError::Unavailable(e.to_string()))?;

    let connection = opened.connection;
    if is_debug_realtime_enabled() {
        logger::debug(
            LogTag::Realtime,
            &format!("Stream {} opened for user {}", connection.id(), session.user_id),
        );
    }

    let connection_id = connection.id().to_string();
    tokio::spawn(async move {
        let reason = connection.run().await;
        if is_debug_realtime_enabled() {
            logger::debug(
                LogTag::Realtime,
                &format!("Stream {} ended ({:?})", connection_id, reason),
            );
        }
    });

    let frames = stream::unfold(opened.frames, |mut rx| async move {
        rx.recv()
            .await
            .map(|frame| (Ok::<_, Infallible>(frame), rx))
    });

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (HeaderName::from_static(X_ACCEL_BUFFERING), "no"),
        ],
        Body::from_stream(frames),
    )
        .into_response())
}
