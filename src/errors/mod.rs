/// Error taxonomy for request-path operations
///
/// Validation errors (auth, permission, quota, conflict) are reported to the
/// caller with a specific status. Cache and transport failures never reach
/// this type: their modules log and swallow them.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// No valid session at handshake or action time
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated but not permitted (self-star, private profile)
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Quota exceeded for an action kind
    #[error("rate limited on {kind}, retry after {retry_after_secs}s")]
    RateLimited {
        kind: String,
        retry_after_secs: u64,
        /// True when the actor hit a lockout window rather than a soft per-window limit
        locked_out: bool,
    },

    /// Duplicate action (e.g. second star on the same profile)
    #[error("conflict: {0}")]
    Conflict(String),

    /// The durable mutation could not be enqueued
    #[error("failed to enqueue mutation: {0}")]
    Queue(String),

    #[error("database error: {0}")]
    Database(String),

    /// A required component is shutting down
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl AppError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Queue(_) => "QUEUE_UNAVAILABLE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Unavailable(_) => "UNAVAILABLE",
        }
    }

    /// Retry hint in seconds, present only for rate limiting
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            AppError::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_retry_hint() {
        let limited = AppError::RateLimited {
            kind: "profile_star".to_string(),
            retry_after_secs: 42,
            locked_out: false,
        };
        assert_eq!(limited.code(), "RATE_LIMITED");
        assert_eq!(limited.retry_after(), Some(42));
        assert_eq!(AppError::Conflict("dup".into()).retry_after(), None);
        assert_eq!(
            AppError::Forbidden("own profile".into()).to_string(),
            "forbidden: own profile"
        );
    }
}
