//! Per-client-IP rate limiting middleware, keyed by the sliding-window
//! limiter on [`AppState`].

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use tracing::warn;

use crate::state::AppState;

/// Evaluate the sliding window for the connecting IP; on exceed, respond
/// 429 with `X-RateLimit-Remaining` and `X-RateLimit-Reset` headers and
/// increment the rejected counter.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = addr.ip().to_string();
    let decision = state.rate_limiter.allow(&key).await;

    if !decision.allowed {
        warn!(client = %key, "rate limit exceeded");
        state.metrics.inc_webhooks_rejected();
        let error = crate::error::Error::RateLimited {
            remaining: decision.remaining,
            reset_seconds: decision.reset_seconds,
        };
        return error.into_response();
    }

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        response.headers_mut().insert("X-RateLimit-Remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.reset_seconds.to_string()) {
        response.headers_mut().insert("X-RateLimit-Reset", value);
    }
    response
}
