//! HTTP-boundary error type: wraps every fallible collaborator and maps to
//! a status code at the axum boundary, the way the teacher's API error
//! enums do.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Result alias for HTTP handlers.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced across the HTTP surface and pipeline driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Shared-secret check failed.
    #[error("unauthorized")]
    Unauthorized,

    /// Per-key rate limit exceeded.
    #[error("rate limit exceeded")]
    RateLimited {
        /// Requests remaining (always 0 when rate limited).
        remaining: u32,
        /// Seconds until the window resets.
        reset_seconds: u64,
    },

    /// Payload failed to parse or normalize.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Requested resource does not exist.
    #[error("not found")]
    NotFound,

    /// The LLM adapter failed (transport or parse).
    #[error("triage failed: {0}")]
    Triage(#[from] autopilot_llm::Error),

    /// The durable store failed.
    #[error("store error: {0}")]
    Store(#[from] autopilot_store::Error),

    /// A core domain operation failed.
    #[error("{0}")]
    Core(#[from] autopilot_core::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Error::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Error::Triage(_) | Error::Store(_) | Error::Core(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let mut response = (status, Json(serde_json::json!({ "error": message }))).into_response();

        if let Error::RateLimited { remaining, reset_seconds } = self {
            if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
                response.headers_mut().insert("X-RateLimit-Remaining", value);
            }
            if let Ok(value) = HeaderValue::from_str(&reset_seconds.to_string()) {
                response.headers_mut().insert("X-RateLimit-Reset", value);
            }
        }

        response
    }
}
