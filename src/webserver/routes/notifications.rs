/// Inbox routes
use axum::{
    extract::{Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    errors::AppError,
    pagination::PageQuery,
    webserver::{auth::AuthSession, state::AppState, utils::success_response},
};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read", post(mark_read))
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkReadRequest {
    /// Empty marks every unread notification
    #[serde(default)]
    pub ids: Vec<i64>,
}

/// GET /api/notifications?offset=&limit=
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let page = state
        .notifications
        .list(&session.user_id, query.resolve(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE))?;
    Ok(success_response(page))
}

/// POST /api/notifications/read  `{ "ids": [..] }`
async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
    Json(request): Json<MarkReadRequest>,
) -> Result<Response, AppError> {
    let unread = state
        .notifications
        .mark_read(&session.user_id, &request.ids)
        .await?;
    Ok(success_response(json!({ "unreadCount": unread })))
}
