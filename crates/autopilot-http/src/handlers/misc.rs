//! Root, health, metrics and runbook-catalog handlers.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /` — service identity.
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "autopilot",
        "version": env!("CARGO_PKG_VERSION"),
        "dry_run": state.config.dry_run,
    }))
}

/// `GET /health` — liveness probe.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "dry_run": state.config.dry_run,
    }))
}

/// `GET /metrics` — atomic counters plus the configured rate limit window.
pub async fn metrics(State(state): State<AppState>) -> Json<Value> {
    let mut snapshot = state.metrics.snapshot();
    snapshot["rate_limit"] = json!({
        "requests_per_window": state.config.rate_limit_requests,
        "window_secs": state.config.rate_limit_window.as_secs(),
    });
    Json(snapshot)
}

/// `GET /api/runbooks` — the static runbook catalog.
pub async fn runbooks(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "runbooks": state.runbooks.entries() }))
}
