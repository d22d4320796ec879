//! Provider-polymorphic triage capability.
//!
//! Modeled on the teacher's `LlmProviderTrait`: a single async capability
//! (`triage`) that every backend implements, with a small closed enum doing
//! the dispatch instead of a boxed trait object, since the set of backends
//! is fixed at configuration time and never extended at runtime.

use crate::error::Result;
use crate::parser::parse_verdict;
use crate::prompt::{user_prompt, SYSTEM_PROMPT};
use autopilot_core::types::{Incident, LlmVerdict};
use async_trait::async_trait;
use std::time::Duration;

/// Single capability every triage backend implements.
#[async_trait]
pub trait TriageProvider: Send + Sync {
    /// Classify `incident`, returning a validated verdict.
    async fn triage(&self, incident: &Incident) -> Result<LlmVerdict>;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}

/// OpenAI-style chat-completions backend.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Construct a client against `base_url` (override for tests) with the
    /// configured model and API key.
    pub fn new(client: reqwest::Client, base_url: String, api_key: String, model: String) -> Self {
        Self { client, base_url, api_key, model }
    }
}

#[async_trait]
impl TriageProvider for OpenAiClient {
    async fn triage(&self, incident: &Incident) -> Result<LlmVerdict> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.1,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt(incident)},
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(crate::error::Error::ProviderStatus { status, body });
        }

        let json: serde_json::Value = response.json().await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| crate::error::Error::Parse("missing choices[0].message.content".into()))?;
        parse_verdict(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Anthropic-style messages backend.
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    /// Construct a client against `base_url` (override for tests) with the
    /// configured model and API key.
    pub fn new(client: reqwest::Client, base_url: String, api_key: String, model: String) -> Self {
        Self { client, base_url, api_key, model }
    }
}

#[async_trait]
impl TriageProvider for AnthropicClient {
    async fn triage(&self, incident: &Incident) -> Result<LlmVerdict> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 1024,
            "system": SYSTEM_PROMPT,
            "messages": [
                {"role": "user", "content": user_prompt(incident)},
            ],
        });

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(crate::error::Error::ProviderStatus { status, body });
        }

        let json: serde_json::Value = response.json().await?;
        let content = json["content"][0]["text"]
            .as_str()
            .ok_or_else(|| crate::error::Error::Parse("missing content[0].text".into()))?;
        parse_verdict(content)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

/// Deterministic, network-free backend.
pub struct MockClient;

#[async_trait]
impl TriageProvider for MockClient {
    async fn triage(&self, incident: &Incident) -> Result<LlmVerdict> {
        Ok(crate::mock::triage(incident))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Closed set of configured backends.
pub enum LlmBackend {
    /// OpenAI-style chat-completions backend.
    OpenAi(OpenAiClient),
    /// Anthropic-style messages backend.
    Anthropic(AnthropicClient),
    /// Deterministic mock backend.
    Mock(MockClient),
}

impl LlmBackend {
    /// Build the OpenAI-style backend.
    pub fn openai(http_timeout: Duration, base_url: String, api_key: String, model: String) -> Self {
        let client = reqwest::Client::builder().timeout(http_timeout).build().unwrap_or_default();
        Self::OpenAi(OpenAiClient::new(client, base_url, api_key, model))
    }

    /// Build the Anthropic-style backend.
    pub fn anthropic(http_timeout: Duration, base_url: String, api_key: String, model: String) -> Self {
        let client = reqwest::Client::builder().timeout(http_timeout).build().unwrap_or_default();
        Self::Anthropic(AnthropicClient::new(client, base_url, api_key, model))
    }

    /// Build the deterministic mock backend.
    pub fn mock() -> Self {
        Self::Mock(MockClient)
    }
}

#[async_trait]
impl TriageProvider for LlmBackend {
    async fn triage(&self, incident: &Incident) -> Result<LlmVerdict> {
        match self {
            Self::OpenAi(client) => client.triage(incident).await,
            Self::Anthropic(client) => client.triage(incident).await,
            Self::Mock(client) => client.triage(incident).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(client) => client.name(),
            Self::Anthropic(client) => client.name(),
            Self::Mock(client) => client.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_core::types::Environment;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn incident() -> Incident {
        Incident {
            external_key: "OPS-1".into(),
            title: "Payments API down".into(),
            description: "all requests returning 500".into(),
            labels: vec![],
            component: "payments".into(),
            environment: Environment::Prod,
            reporter: "unknown".into(),
            created_at: chrono::Utc::now(),
            raw_payload: json!({}),
        }
    }

    #[tokio::test]
    async fn openai_backend_parses_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content":
                    "{\"category\":\"application\",\"severity\":\"p2\",\"confidence\":0.9,\
                      \"owner_team\":\"payments-oncall\",\"summary\":\"s\",\"first_actions\":[],\
                      \"runbook_suggestion\":\"application\"}"
                }}]
            })))
            .mount(&server)
            .await;

        let backend = LlmBackend::openai(
            Duration::from_secs(5),
            server.uri(),
            "test-key".into(),
            "gpt-test".into(),
        );
        let verdict = backend.triage(&incident()).await.unwrap();
        assert_eq!(verdict.confidence, 0.9);
    }

    #[tokio::test]
    async fn anthropic_backend_parses_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"text":
                    "{\"category\":\"database\",\"severity\":\"p1\",\"confidence\":0.95}"
                }]
            })))
            .mount(&server)
            .await;

        let backend = LlmBackend::anthropic(
            Duration::from_secs(5),
            server.uri(),
            "test-key".into(),
            "claude-test".into(),
        );
        let verdict = backend.triage(&incident()).await.unwrap();
        assert_eq!(verdict.confidence, 0.95);
    }

    #[tokio::test]
    async fn non_success_status_surfaces_as_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let backend = LlmBackend::openai(
            Duration::from_secs(5),
            server.uri(),
            "test-key".into(),
            "gpt-test".into(),
        );
        let err = backend.triage(&incident()).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::ProviderStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn mock_backend_never_touches_network() {
        let backend = LlmBackend::mock();
        let verdict = backend.triage(&incident()).await.unwrap();
        assert_eq!(verdict.confidence, 0.85);
    }
}
