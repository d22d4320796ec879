//! Ticketing side effect: update the source issue's priority/labels and
//! post a structured comment describing the triage outcome.

use autopilot_core::types::{Incident, PolicyVerdict};
use serde_json::{json, Value};
use std::time::Duration;

/// Ticketing client, inert unless base URL and credentials are configured.
pub struct JiraClient {
    client: reqwest::Client,
    base_url: String,
    email: String,
    token: String,
}

impl JiraClient {
    /// Build a client from configuration; `None` if the base URL is absent.
    pub fn new(timeout: Duration, base_url: Option<String>, email: Option<String>, token: Option<String>) -> Option<Self> {
        let base_url = base_url?;
        let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
        Some(Self {
            client,
            base_url,
            email: email.unwrap_or_default(),
            token: token.unwrap_or_default(),
        })
    }

    fn priority_name(severity: autopilot_core::types::Severity) -> &'static str {
        use autopilot_core::types::Severity::*;
        match severity {
            P1 => "Highest",
            P2 => "High",
            P3 => "Medium",
            P4 => "Low",
        }
    }

    fn update_payload(verdict: &PolicyVerdict) -> Value {
        json!({
            "fields": {
                "priority": {"name": Self::priority_name(verdict.final_severity)},
                "labels": verdict.labels,
            }
        })
    }

    fn comment_payload(incident: &Incident, verdict: &PolicyVerdict) -> Value {
        json!({
            "body": format!(
                "Autopilot triage: severity {} (confidence {:.2}){}",
                verdict.final_severity,
                verdict.confidence,
                verdict
                    .override_reason
                    .as_deref()
                    .map(|r| format!(" — {r}"))
                    .unwrap_or_default(),
            ),
            "incident_key": incident.external_key,
        })
    }

    /// PUT updated fields and POST a comment on the source issue.
    pub async fn update_issue(&self, incident: &Incident, verdict: &PolicyVerdict) -> Result<(), String> {
        let issue_url = format!("{}/rest/api/3/issue/{}", self.base_url, incident.external_key);
        let response = self
            .client
            .put(&issue_url)
            .basic_auth(&self.email, Some(&self.token))
            .json(&Self::update_payload(verdict))
            .send()
            .await
            .map_err(|e| format!("failed to update jira issue: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("jira update returned {}", response.status()));
        }

        let comment_url = format!("{issue_url}/comment");
        let response = self
            .client
            .post(&comment_url)
            .basic_auth(&self.email, Some(&self.token))
            .json(&Self::comment_payload(incident, verdict))
            .send()
            .await
            .map_err(|e| format!("failed to post jira comment: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("jira comment returned {}", response.status()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_core::types::Severity;

    fn verdict(final_severity: Severity) -> PolicyVerdict {
        PolicyVerdict {
            original_severity: Severity::P3,
            final_severity,
            overridden: true,
            override_reason: Some("production outage keyword raised severity to P2".into()),
            needs_human_review: false,
            confidence: 0.9,
            labels: vec!["autopilot".into(), "sev:P2".into()],
        }
    }

    #[test]
    fn update_payload_maps_severity_to_priority() {
        let payload = JiraClient::update_payload(&verdict(Severity::P2));
        assert_eq!(payload["fields"]["priority"]["name"], "High");
    }

    #[test]
    fn comment_payload_mentions_override_reason() {
        let incident = Incident {
            external_key: "OPS-1".into(),
            title: "t".into(),
            description: "d".into(),
            labels: vec![],
            component: "payments".into(),
            environment: autopilot_core::types::Environment::Prod,
            reporter: "unknown".into(),
            created_at: chrono::Utc::now(),
            raw_payload: json!({}),
        };
        let payload = JiraClient::comment_payload(&incident, &verdict(Severity::P2));
        assert!(payload["body"].as_str().unwrap().contains("production outage"));
    }
}
