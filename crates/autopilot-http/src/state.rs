//! Composition root: every collaborator the pipeline driver and handlers
//! need, built once at startup and shared via `axum::extract::State`.

use crate::config::{AppConfig, LlmProvider};
use crate::integrations::{JiraClient, SlackClient};
use crate::metrics::Metrics;
use autopilot_core::rate_limit::RateLimiter;
use autopilot_core::runbook::RunbookCatalog;
use autopilot_llm::LlmBackend;
use autopilot_store::{AuditSink, Store};
use std::sync::Arc;

/// Shared application state, cheap to clone (everything behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration, loaded once and never re-read per request.
    pub config: Arc<AppConfig>,
    /// Durable store.
    pub store: Store,
    /// Dual-write audit sink.
    pub audit: Arc<AuditSink>,
    /// Per-client sliding-window rate limiter.
    pub rate_limiter: RateLimiter,
    /// Provider-polymorphic LLM client.
    pub llm: Arc<LlmBackend>,
    /// Static runbook catalog.
    pub runbooks: Arc<RunbookCatalog>,
    /// Ticketing side-effect client, absent when not configured.
    pub jira: Arc<Option<JiraClient>>,
    /// Chat side-effect client, absent when not configured.
    pub slack: Arc<Option<SlackClient>>,
    /// Atomic process-local counters.
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Build the composition root from resolved configuration and an
    /// already-migrated store.
    pub fn new(config: AppConfig, store: Store) -> Self {
        let audit = Arc::new(AuditSink::new(store.clone(), config.audit_log_path.clone()));

        let llm = match config.llm_provider {
            LlmProvider::OpenAi => LlmBackend::openai(
                config.http_timeout,
                config
                    .llm_base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                config.llm_api_key.clone(),
                config.llm_model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
            ),
            LlmProvider::Anthropic => LlmBackend::anthropic(
                config.http_timeout,
                config
                    .llm_base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.anthropic.com/v1".to_string()),
                config.llm_api_key.clone(),
                config.llm_model.clone().unwrap_or_else(|| "claude-3-haiku-20240307".to_string()),
            ),
            LlmProvider::Mock => LlmBackend::mock(),
        };

        let jira = JiraClient::new(
            config.http_timeout,
            config.jira_base_url.clone(),
            config.jira_email.clone(),
            config.jira_token.clone(),
        );
        let slack =
            SlackClient::new(config.http_timeout, config.slack_bot_token.clone(), config.slack_channel.clone());

        Self {
            rate_limiter: RateLimiter::new(config.rate_limit_requests, config.rate_limit_window),
            config: Arc::new(config),
            store,
            audit,
            llm: Arc::new(llm),
            runbooks: Arc::new(RunbookCatalog::default_catalog()),
            jira: Arc::new(jira),
            slack: Arc::new(slack),
            metrics: Arc::new(Metrics::new()),
        }
    }
}
