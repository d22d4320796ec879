//! Environment-variable layered configuration, read once at startup with
//! plain `std::env::var` calls into a single struct, in the teacher's own
//! configuration style (no figment/envy indirection).

use std::time::Duration;

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Shared secret required on `X-AUTOPILOT-SECRET` for webhook ingest.
    pub webhook_secret: Option<String>,
    /// Requests per window for the rate limiter.
    pub rate_limit_requests: u32,
    /// Rate limiter window length.
    pub rate_limit_window: Duration,
    /// Selected LLM provider.
    pub llm_provider: LlmProvider,
    /// LLM API key, if applicable.
    pub llm_api_key: String,
    /// LLM model id, if overridden.
    pub llm_model: Option<String>,
    /// LLM base URL override (used in tests).
    pub llm_base_url: Option<String>,
    /// Jira base URL.
    pub jira_base_url: Option<String>,
    /// Jira account email.
    pub jira_email: Option<String>,
    /// Jira API token.
    pub jira_token: Option<String>,
    /// Slack bot token.
    pub slack_bot_token: Option<String>,
    /// Slack channel id.
    pub slack_channel: Option<String>,
    /// SQLite store path.
    pub store_path: String,
    /// Append-only audit log path.
    pub audit_log_path: String,
    /// When true, external side effects are replaced with "would-have" audit entries.
    pub dry_run: bool,
    /// Correlation lookup window.
    pub correlation_window: Duration,
    /// Outbound HTTP call timeout.
    pub http_timeout: Duration,
    /// Demo token accepted on the web-UI ingest path.
    pub demo_token: Option<String>,
    /// HTTP listen address.
    pub bind_addr: String,
}

/// Closed set of configured LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// OpenAI-style chat-completions backend.
    OpenAi,
    /// Anthropic-style messages backend.
    Anthropic,
    /// Deterministic mock backend.
    Mock,
}

impl AppConfig {
    /// Load configuration from the process environment, applying typed
    /// defaults for anything absent or unparseable.
    pub fn from_env() -> Self {
        Self {
            webhook_secret: env_string("AUTOPILOT_WEBHOOK_SECRET"),
            rate_limit_requests: env_parsed("AUTOPILOT_RATE_LIMIT_REQUESTS", 60),
            rate_limit_window: Duration::from_secs(env_parsed(
                "AUTOPILOT_RATE_LIMIT_WINDOW_SECS",
                60,
            )),
            llm_provider: env_string("AUTOPILOT_LLM_PROVIDER")
                .as_deref()
                .map(LlmProvider::parse)
                .unwrap_or(LlmProvider::Mock),
            llm_api_key: env_string("AUTOPILOT_LLM_API_KEY").unwrap_or_default(),
            llm_model: env_string("AUTOPILOT_LLM_MODEL"),
            llm_base_url: env_string("AUTOPILOT_LLM_BASE_URL"),
            jira_base_url: env_string("AUTOPILOT_JIRA_BASE_URL"),
            jira_email: env_string("AUTOPILOT_JIRA_EMAIL"),
            jira_token: env_string("AUTOPILOT_JIRA_TOKEN"),
            slack_bot_token: env_string("AUTOPILOT_SLACK_BOT_TOKEN"),
            slack_channel: env_string("AUTOPILOT_SLACK_CHANNEL"),
            store_path: env_string("AUTOPILOT_STORE_PATH")
                .unwrap_or_else(|| "./autopilot.db".to_string()),
            audit_log_path: env_string("AUTOPILOT_AUDIT_LOG_PATH")
                .unwrap_or_else(|| "./audit.log".to_string()),
            dry_run: env_parsed("AUTOPILOT_DRY_RUN", true),
            correlation_window: Duration::from_secs(
                env_parsed::<u64>("AUTOPILOT_CORRELATION_WINDOW_MINUTES", 30) * 60,
            ),
            http_timeout: Duration::from_secs(env_parsed("AUTOPILOT_HTTP_TIMEOUT_SECS", 30)),
            demo_token: env_string("AUTOPILOT_DEMO_TOKEN"),
            bind_addr: env_string("AUTOPILOT_BIND_ADDR")
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        }
    }
}

impl AppConfig {
    /// Whether the configured provider is the deterministic mock backend.
    pub fn llm_provider_is_mock(&self) -> bool {
        self.llm_provider == LlmProvider::Mock
    }
}

impl LlmProvider {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Self::OpenAi,
            "anthropic" => Self::Anthropic,
            _ => Self::Mock,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
