//! Deterministic, network-free triage backend used in tests, local
//! development, and whenever the caller has no demo token on the web
//! ingest path.

use autopilot_core::types::{Incident, IncidentCategory, LlmVerdict, Severity};

const SEVERITY_P1: &[&str] = &["security", "breach", "critical", "p1"];
const SEVERITY_P2: &[&str] = &["outage", "down", "500", "cannot", "failing"];
const SEVERITY_P3: &[&str] = &["degraded", "slow", "intermittent"];

const CATEGORY_KEYWORDS: &[(IncidentCategory, &[&str])] = &[
    (IncidentCategory::Security, &["security", "breach", "unauthorized", "exfiltrat"]),
    (IncidentCategory::Database, &["database", "replica", "query", "sql", "postgres", "mysql"]),
    (IncidentCategory::Network, &["network", "dns", "timeout", "connection", "latency"]),
    (IncidentCategory::Deployment, &["deploy", "rollout", "release", "canary"]),
    (IncidentCategory::Infrastructure, &["infrastructure", "node", "cluster", "disk", "cpu", "memory"]),
    (IncidentCategory::Application, &["application", "exception", "crash", "bug"]),
];

/// Classify `incident` with fixed keyword rules and a constant confidence.
pub fn triage(incident: &Incident) -> LlmVerdict {
    let text = incident.searchable_text().to_ascii_lowercase();

    let category = CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(category, _)| *category)
        .unwrap_or(IncidentCategory::Unknown);

    let severity = if SEVERITY_P1.iter().any(|kw| text.contains(kw)) {
        Severity::P1
    } else if SEVERITY_P2.iter().any(|kw| text.contains(kw)) {
        Severity::P2
    } else if SEVERITY_P3.iter().any(|kw| text.contains(kw)) {
        Severity::P3
    } else {
        Severity::P4
    };

    LlmVerdict {
        category,
        severity,
        confidence: 0.85,
        owner_team: format!("{}-oncall", incident.component),
        summary: format!(
            "{} incident on {} ({:?})",
            category.as_str(),
            incident.component,
            incident.environment
        ),
        first_actions: vec![
            format!("Acknowledge the {} alert", incident.component),
            "Check recent deploys and config changes".to_string(),
            "Page the owning team if impact is confirmed".to_string(),
        ],
        runbook_suggestion: category.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_core::types::Environment;
    use serde_json::json;

    fn incident(title: &str, description: &str) -> Incident {
        Incident {
            external_key: "OPS-1".into(),
            title: title.into(),
            description: description.into(),
            labels: vec![],
            component: "payments".into(),
            environment: Environment::Prod,
            reporter: "unknown".into(),
            created_at: chrono::Utc::now(),
            raw_payload: json!({}),
        }
    }

    #[test]
    fn security_keyword_forces_p1() {
        let verdict = triage(&incident("Security breach detected", "unauthorized access"));
        assert_eq!(verdict.severity, Severity::P1);
        assert_eq!(verdict.category, IncidentCategory::Security);
    }

    #[test]
    fn outage_keyword_maps_to_p2() {
        let verdict = triage(&incident("Payments API down", "all requests returning 500"));
        assert_eq!(verdict.severity, Severity::P2);
    }

    #[test]
    fn degraded_keyword_maps_to_p3() {
        let verdict = triage(&incident("Checkout is slow", "intermittent latency spikes"));
        assert_eq!(verdict.severity, Severity::P3);
    }

    #[test]
    fn no_keyword_match_defaults_to_p4_and_unknown() {
        let verdict = triage(&incident("Heads up", "just a note"));
        assert_eq!(verdict.severity, Severity::P4);
        assert_eq!(verdict.category, IncidentCategory::Unknown);
    }

    #[test]
    fn confidence_is_constant() {
        let verdict = triage(&incident("Database replica lag", "lag growing"));
        assert_eq!(verdict.confidence, 0.85);
    }
}
