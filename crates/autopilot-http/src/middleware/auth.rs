//! Webhook shared-secret check. Only the `/webhook/jira` ingest route
//! carries this middleware; the web-UI routes use an optional demo token
//! instead (checked inline in the incident-create handler).

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use ring::constant_time::verify_slices_are_equal;
use tracing::warn;

use crate::state::AppState;

const SECRET_HEADER: &str = "x-autopilot-secret";

/// Reject the request unless `X-AUTOPILOT-SECRET` matches the configured
/// webhook secret, compared in constant time. When no secret is configured
/// (dry-run demo mode), authentication is skipped.
pub async fn require_webhook_secret(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.config.webhook_secret.as_ref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if verify_slices_are_equal(provided.as_bytes(), expected.as_bytes()).is_err() {
        warn!("webhook authentication failed");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}
