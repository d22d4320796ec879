//! Chat side effect: post a block-structured message with a plain
//! fallback text and a severity-colored attachment.

use autopilot_core::types::{Incident, PolicyVerdict, Severity};
use serde_json::{json, Value};
use std::time::Duration;

/// Chat client, inert unless a bot token and channel are configured.
pub struct SlackClient {
    client: reqwest::Client,
    bot_token: String,
    channel: String,
}

impl SlackClient {
    /// Build a client from configuration; `None` if token or channel absent.
    pub fn new(timeout: Duration, bot_token: Option<String>, channel: Option<String>) -> Option<Self> {
        let bot_token = bot_token?;
        let channel = channel?;
        let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
        Some(Self { client, bot_token, channel })
    }

    fn color_for(severity: Severity) -> &'static str {
        match severity {
            Severity::P1 => "#FF0000",
            Severity::P2 => "#FF8C00",
            Severity::P3 => "#FFD700",
            Severity::P4 => "#32CD32",
        }
    }

    fn message_payload(&self, incident: &Incident, verdict: &PolicyVerdict) -> Value {
        let title = format!("Incident triaged: {} ({})", incident.title, incident.external_key);
        json!({
            "channel": self.channel,
            "text": title,
            "blocks": [
                {
                    "type": "header",
                    "text": {"type": "plain_text", "text": title}
                },
                {
                    "type": "section",
                    "fields": [
                        {"type": "mrkdwn", "text": format!("*Severity:*\n{}", verdict.final_severity)},
                        {"type": "mrkdwn", "text": format!("*Component:*\n{}", incident.component)},
                        {"type": "mrkdwn", "text": format!("*Confidence:*\n{:.2}", verdict.confidence)},
                    ]
                },
            ],
            "attachments": [
                {"color": Self::color_for(verdict.final_severity)}
            ]
        })
    }

    /// POST the triage notification to the configured channel.
    pub async fn notify(&self, incident: &Incident, verdict: &PolicyVerdict) -> Result<(), String> {
        let response = self
            .client
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&self.bot_token)
            .json(&self.message_payload(incident, verdict))
            .send()
            .await
            .map_err(|e| format!("failed to send slack message: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("slack returned {}", response.status()));
        }

        let body: Value = response.json().await.map_err(|e| format!("invalid slack response: {e}"))?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            return Err(format!("slack error: {}", body.get("error").and_then(Value::as_str).unwrap_or("unknown")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn incident() -> Incident {
        Incident {
            external_key: "OPS-1".into(),
            title: "Payments API down".into(),
            description: "d".into(),
            labels: vec![],
            component: "payments".into(),
            environment: autopilot_core::types::Environment::Prod,
            reporter: "unknown".into(),
            created_at: chrono::Utc::now(),
            raw_payload: json!({}),
        }
    }

    fn verdict() -> PolicyVerdict {
        PolicyVerdict {
            original_severity: Severity::P3,
            final_severity: Severity::P2,
            overridden: true,
            override_reason: None,
            needs_human_review: false,
            confidence: 0.9,
            labels: vec![],
        }
    }

    #[test]
    fn new_requires_both_token_and_channel() {
        assert!(SlackClient::new(Duration::from_secs(5), None, Some("C1".into())).is_none());
        assert!(SlackClient::new(Duration::from_secs(5), Some("tok".into()), None).is_none());
        assert!(SlackClient::new(Duration::from_secs(5), Some("tok".into()), Some("C1".into())).is_some());
    }

    #[test]
    fn message_payload_colors_by_severity() {
        let client = SlackClient::new(Duration::from_secs(5), Some("tok".into()), Some("C1".into())).unwrap();
        let payload = client.message_payload(&incident(), &verdict());
        assert_eq!(payload["attachments"][0]["color"], "#FF8C00");
    }
}
