/// Internal publish endpoint
///
/// Lets collaborators (chat completion, QR scanners, the auth service) push
/// application events to one session or to every live session of a user.
/// Guarded by a shared token; disabled when no token is configured.
use axum::{extract::State, http::HeaderMap, response::Response, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    errors::AppError,
    logger::{self, LogTag},
    realtime::{is_system_event, is_valid_event_type},
    webserver::{state::AppState, utils::success_response},
};

pub const INTERNAL_TOKEN_HEADER: &str = "X-Internal-Token";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/internal/events", post(publish_event))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub session_key: Option<String>,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
}

/// POST /api/internal/events
async fn publish_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<PublishRequest>,
) -> Result<Response, AppError> {
    let expected = state.config.internal_token.as_str();
    if expected.is_empty() {
        return Err(AppError::Forbidden("internal publishing is disabled".to_string()));
    }
    let provided = headers
        .get(INTERNAL_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if provided != Some(expected) {
        logger::warning(LogTag::Webserver, "Blocked internal publish with a bad token");
        return Err(AppError::Unauthenticated);
    }

    if !is_valid_event_type(&request.event_type) {
        return Err(AppError::InvalidInput(format!(
            "malformed event type '{}'",
            request.event_type
        )));
    }
    if is_system_event(&request.event_type) {
        return Err(AppError::InvalidInput(
            "system.* events are reserved for the stream transport".to_string(),
        ));
    }

    let sessions = match (request.session_key, request.user_id) {
        (Some(key), None) => vec![key],
        (None, Some(user_id)) => state.identity.sessions_for_user(&user_id).await?,
        _ => {
            return Err(AppError::InvalidInput(
                "exactly one of sessionKey or userId is required".to_string(),
            ))
        }
    };

    let delivered: usize = sessions
        .iter()
        .map(|key| state.hub.publish(key, &request.event_type, &request.payload))
        .sum();

    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!(
                "Internal publish {}: {} sessions, {} deliveries",
                request.event_type,
                sessions.len(),
                delivered
            ),
        );
    }

    Ok(success_response(json!({
        "sessions": sessions.len(),
        "delivered": delivered,
    })))
}
