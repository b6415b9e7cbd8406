use axum::{extract::State, response::Response, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    jobs::JobMetricsSnapshot,
    realtime::HubMetricsSnapshot,
    webserver::{state::AppState, utils::success_response},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub active_subscriptions: usize,
    pub hub: HubMetricsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<JobMetricsSnapshot>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(system_status))
}

/// GET /api/status
async fn system_status(State(state): State<Arc<AppState>>) -> Response {
    let status = if state.hub.is_shut_down() {
        "shutting_down"
    } else {
        "ok"
    };

    success_response(StatusResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        active_subscriptions: state.hub.active_subscriptions(),
        hub: state.hub.metrics().snapshot(),
        jobs: state.jobs.as_ref().map(|jobs| jobs.metrics()),
    })
}
