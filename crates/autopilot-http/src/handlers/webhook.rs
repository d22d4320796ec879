//! Inbound ticketing webhook ingest.

use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::error::Result;
use crate::pipeline::{run_webhook_ingest, WebhookResponse};
use crate::state::AppState;

/// `POST /webhook/jira` — authenticated and rate-limited upstream by
/// middleware; runs the full ingest pipeline.
pub async fn ingest_jira(State(state): State<AppState>, Json(payload): Json<Value>) -> Result<Json<WebhookResponse>> {
    let response = run_webhook_ingest(&state, payload).await?;
    Ok(Json(response))
}
