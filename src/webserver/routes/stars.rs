/// Star routes
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    errors::AppError,
    logger::{self, LogTag},
    pagination::PageQuery,
    webserver::{auth::AuthSession, state::AppState, utils::success_response},
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stars", post(star_action))
        .route("/profiles/:profile_id/star", post(star_profile))
        .route("/profiles/:profile_id/unstar", post(unstar_profile))
        .route("/profiles/:profile_id/stars", get(list_stars))
        .route("/profiles/:profile_id/star-status", get(star_status))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StarAction {
    Star,
    Unstar,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarActionRequest {
    pub profile_id: String,
    #[serde(default = "default_action")]
    pub action: StarAction,
}

fn default_action() -> StarAction {
    StarAction::Star
}

/// POST /api/stars  `{ "profileId", "action": "star" | "unstar" }`
async fn star_action(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
    Json(request): Json<StarActionRequest>,
) -> Result<Response, AppError> {
    if request.profile_id.trim().is_empty() {
        return Err(AppError::InvalidInput("profileId is required".to_string()));
    }
    let outcome = match request.action {
        StarAction::Star => state.stars.star(&session.user_id, &request.profile_id).await?,
        StarAction::Unstar => state.stars.unstar(&session.user_id, &request.profile_id).await?,
    };
    Ok(success_response(outcome))
}

/// POST /api/profiles/:profile_id/star
async fn star_profile(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
    Path(profile_id): Path<String>,
) -> Result<Response, AppError> {
    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!("Star request for {} by {}", profile_id, session.user_id),
        );
    }
    let outcome = state.stars.star(&session.user_id, &profile_id).await?;
    Ok(success_response(outcome))
}

/// POST /api/profiles/:profile_id/unstar
async fn unstar_profile(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
    Path(profile_id): Path<String>,
) -> Result<Response, AppError> {
    let outcome = state.stars.unstar(&session.user_id, &profile_id).await?;
    Ok(success_response(outcome))
}

/// GET /api/profiles/:profile_id/stars?offset=&limit=
async fn list_stars(
    State(state): State<Arc<AppState>>,
    viewer: Option<AuthSession>,
    Path(profile_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let viewer_id = viewer.as_ref().map(|AuthSession(s)| s.user_id.as_str());
    let page = state.stars.get_stars(viewer_id, &profile_id, query).await?;
    Ok(success_response(page))
}

/// GET /api/profiles/:profile_id/star-status
async fn star_status(
    State(state): State<Arc<AppState>>,
    AuthSession(session): AuthSession,
    Path(profile_id): Path<String>,
) -> Result<Response, AppError> {
    let status = state.stars.star_status(&session.user_id, &profile_id).await?;
    Ok(success_response(status))
}
