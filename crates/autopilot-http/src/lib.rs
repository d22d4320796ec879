//! # autopilot-http
//!
//! HTTP surface, pipeline driver and composition root for the incident
//! triage autopilot. Wires the webhook ingest pipeline, the web-UI incident
//! API and the service/ops endpoints onto a single axum [`Router`], built
//! once from an [`AppState`] composition root.

pub mod config;
pub mod error;
pub mod handlers;
pub mod integrations;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use state::AppState;

/// Build the full application router: service endpoints, the authenticated
/// ticketing webhook, and the web-UI incident API, with tracing and CORS
/// layered on top (matching the teacher's router-assembly style).
pub fn build_router(state: AppState) -> Router {
    let webhook_routes = Router::new()
        .route("/webhook/jira", post(handlers::webhook::ingest_jira))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::enforce_rate_limit))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::require_webhook_secret));

    let incident_routes = Router::new()
        .route("/api/incidents", post(handlers::incidents::create).get(handlers::incidents::list))
        .route("/api/incidents/{id}", get(handlers::incidents::get))
        .route("/api/incidents/{id}/triage", post(handlers::incidents::triage))
        .route("/api/incidents/{id}/approve", post(handlers::incidents::approve))
        .route("/api/incidents/{id}/reject", post(handlers::incidents::reject))
        .route("/api/incidents/{id}/override", post(handlers::incidents::override_verdict))
        .route("/api/incidents/{id}/resolve", post(handlers::incidents::resolve))
        .route("/api/incidents/{id}/pir", post(handlers::incidents::pir))
        .route("/api/incidents/{id}/audit", get(handlers::incidents::audit_trail));

    Router::new()
        .route("/", get(handlers::misc::root))
        .route("/health", get(handlers::misc::health))
        .route("/metrics", get(handlers::misc::metrics))
        .route("/api/runbooks", get(handlers::misc::runbooks))
        .merge(webhook_routes)
        .merge(incident_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the router on `config.bind_addr`, accepting connections
/// until the process is terminated. Requires `ConnectInfo<SocketAddr>` for
/// the rate-limiting middleware to key on client IP.
pub async fn serve(config: AppConfig, state: AppState) -> std::io::Result<()> {
    let bind_addr: SocketAddr = config
        .bind_addr
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080)));
    let router = build_router(state).into_make_service_with_connect_info::<SocketAddr>();

    tracing::info!(addr = %bind_addr, "autopilot listening");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, router).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_llm::LlmBackend;
    use autopilot_store::Store;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::tempdir;

    async fn test_state() -> (AppState, Arc<tempfile::TempDir>) {
        let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        let store = Store::from_pool(pool).await.unwrap();
        let dir = Arc::new(tempdir().unwrap());
        let mut config = AppConfig::from_env();
        config.audit_log_path = dir.path().join("audit.log").to_string_lossy().to_string();
        config.webhook_secret = Some("s3cret".to_string());
        let mut state = AppState::new(config, store);
        state.llm = Arc::new(LlmBackend::mock());
        (state, dir)
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);
        let response = tower::ServiceExt::oneshot(
            router,
            axum::http::Request::builder().uri("/health").body(axum::body::Body::empty()).unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
