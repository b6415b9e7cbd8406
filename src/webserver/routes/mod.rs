use axum::Router;
use std::sync::Arc;

use crate::webserver::state::AppState;

pub mod events;
pub mod notifications;
pub mod stars;
pub mod status;
pub mod stream;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new().nest("/api", api_routes()).with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(status::routes())
        .merge(stream::routes())
        .merge(stars::routes())
        .merge(notifications::routes())
        .merge(events::routes())
}
