/// Session extraction
///
/// The session key may arrive as `Authorization: Bearer <key>`, a `session`
/// cookie, or a `session` query parameter (EventSource cannot set headers).
use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    errors::AppError,
    identity::SessionInfo,
    logger::{self, LogTag},
    webserver::state::AppState,
};

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_QUERY_PARAM: &str = "session";

/// A validated session; rejects with 401
pub struct AuthSession(pub SessionInfo);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Some(key) = session_key_from_parts(parts) else {
            return Err(AppError::Unauthenticated);
        };

        match state.identity.validate(&key).await? {
            Some(info) => Ok(AuthSession(info)),
            None => {
                if is_debug_webserver_enabled() {
                    logger::debug(
                        LogTag::Webserver,
                        &format!("Rejected unknown session on {}", parts.uri.path()),
                    );
                }
                Err(AppError::Unauthenticated)
            }
        }
    }
}

pub fn session_key_from_parts(parts: &Parts) -> Option<String> {
    bearer_token(parts)
        .or_else(|| cookie_value(parts, SESSION_COOKIE))
        .or_else(|| query_value(parts, SESSION_QUERY_PARAM))
        .filter(|key| !key.is_empty())
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn query_value(parts: &Parts, name: &str) -> Option<String> {
    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri).ok()?;
    params.remove(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_session_sources_in_priority_order() {
        let p = parts(
            Request::builder()
                .uri("/api/stream?session=from-query")
                .header(header::COOKIE, "theme=dark; session=from-cookie")
                .header(header::AUTHORIZATION, "Bearer from-header"),
        );
        assert_eq!(session_key_from_parts(&p).as_deref(), Some("from-header"));

        let p = parts(
            Request::builder()
                .uri("/api/stream?session=from-query")
                .header(header::COOKIE, "theme=dark; session=from-cookie"),
        );
        assert_eq!(session_key_from_parts(&p).as_deref(), Some("from-cookie"));

        let p = parts(Request::builder().uri("/api/stream?x=1&session=from-query"));
        assert_eq!(session_key_from_parts(&p).as_deref(), Some("from-query"));

        let p = parts(Request::builder().uri("/api/stream?session="));
        assert_eq!(session_key_from_parts(&p), None);
    }

    #[test]
    fn test_query_session_is_percent_decoded() {
        let p = parts(Request::builder().uri("/api/stream?session=abc%2Bdef%3D%3D&x=1"));
        assert_eq!(session_key_from_parts(&p).as_deref(), Some("abc+def=="));
    }
}
