/// HTTP surface
///
/// Axum server exposing the SSE stream, star actions, the inbox and an
/// internal publish endpoint for collaborators, all under `/api`.
pub mod auth;
pub mod routes;
pub mod server;
pub mod state;
pub mod utils;


pub use server::{build_app, shutdown, start_server};
pub use state::AppState;
