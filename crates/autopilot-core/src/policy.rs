//! Deterministic policy guardrails that turn a probabilistic LLM verdict
//! into a committed severity.

use crate::types::{Environment, Incident, IncidentCategory, LlmVerdict, PolicyVerdict, Severity};
use once_cell::sync::Lazy;
use regex::RegexSet;

fn word_set(words: &[&str]) -> RegexSet {
    let patterns: Vec<String> =
        words.iter().map(|w| format!(r"(?i)\b{}\b", w)).collect();
    RegexSet::new(patterns).expect("static policy keyword patterns are valid regexes")
}

static OUTAGE_KEYWORDS: Lazy<RegexSet> = Lazy::new(|| {
    word_set(&[
        "outage",
        "down",
        "service unavailable",
        "500",
        "error rate spike",
        "cannot",
        "failing",
        "timeouts?",
    ])
});

static SECURITY_KEYWORDS: Lazy<RegexSet> = Lazy::new(|| {
    word_set(&[
        "security",
        "breach",
        "unauthorized",
        "leak",
        "exfiltration",
        "exploit",
        "vulnerability",
        "cve",
    ])
});

const CONFIDENCE_GATE_THRESHOLD: f64 = 0.70;
const CORRELATION_SIMILARITY_THRESHOLD: f64 = 0.60;

/// Re-exported for the correlator, which shares this fixed threshold.
pub const SIMILARITY_THRESHOLD: f64 = CORRELATION_SIMILARITY_THRESHOLD;

/// Evaluate the ordered policy rules against a normalized incident and its
/// LLM verdict, producing a committed policy verdict.
pub fn evaluate(incident: &Incident, verdict: &LlmVerdict) -> PolicyVerdict {
    let mut severity = verdict.severity;
    let mut overridden = false;
    let mut override_reason: Option<String> = None;
    let text = incident.searchable_text();

    // Rule 1: non-prod cap. Skips outage/security rules entirely when it
    // applies, per the precedence clarification in the policy design.
    if incident.environment != Environment::Prod {
        if severity < Severity::P3 {
            severity = Severity::P3;
            overridden = true;
            override_reason = Some("non-production environment capped to P3".to_string());
        }
    } else {
        // Rule 2: prod outage floor.
        if OUTAGE_KEYWORDS.is_match(&text) && severity > Severity::P2 {
            severity = Severity::P2;
            overridden = true;
            override_reason = Some("production outage keyword raised severity to P2".to_string());
        }

        // Rule 3: prod security override, supersedes the outage floor.
        if SECURITY_KEYWORDS.is_match(&text) {
            severity = Severity::P1;
            overridden = true;
            override_reason =
                Some("production security keyword forces severity to P1".to_string());
        }
    }

    // Rule 4: confidence gate, orthogonal to severity.
    let needs_human_review = verdict.confidence < CONFIDENCE_GATE_THRESHOLD;

    let mut labels = vec![
        "autopilot".to_string(),
        format!("type:{}", verdict.category.as_str()),
        format!("sev:{}", severity),
    ];
    if needs_human_review {
        labels.push("needs-review".to_string());
    }

    PolicyVerdict {
        original_severity: verdict.severity,
        final_severity: severity,
        overridden,
        override_reason,
        needs_human_review,
        confidence: verdict.confidence,
        labels,
    }
}

/// Re-evaluate a policy verdict after a human override, given a possibly
/// new severity and/or category.
pub fn apply_human_override(
    previous: &PolicyVerdict,
    new_severity: Option<Severity>,
    new_category: Option<IncidentCategory>,
    reason: &str,
) -> PolicyVerdict {
    let final_severity = new_severity.unwrap_or(previous.final_severity);
    let category = new_category
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|| {
            previous
                .labels
                .iter()
                .find_map(|l| l.strip_prefix("type:"))
                .unwrap_or("unknown")
                .to_string()
        });

    let mut labels = vec![
        "autopilot".to_string(),
        format!("type:{category}"),
        format!("sev:{final_severity}"),
    ];
    if previous.needs_human_review {
        labels.push("needs-review".to_string());
    }

    PolicyVerdict {
        original_severity: previous.original_severity,
        final_severity,
        overridden: true,
        override_reason: Some(reason.to_string()),
        needs_human_review: previous.needs_human_review,
        confidence: previous.confidence,
        labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Incident;
    use chrono::Utc;
    use serde_json::json;

    fn incident(environment: Environment, title: &str, description: &str) -> Incident {
        Incident {
            external_key: "OPS-1".into(),
            title: title.into(),
            description: description.into(),
            labels: vec![],
            component: "auth-service".into(),
            environment,
            reporter: "unknown".into(),
            created_at: Utc::now(),
            raw_payload: json!({}),
        }
    }

    fn verdict(category: IncidentCategory, severity: Severity, confidence: f64) -> LlmVerdict {
        LlmVerdict {
            category,
            severity,
            confidence,
            owner_team: "platform".into(),
            summary: "summary".into(),
            first_actions: vec!["check logs".into()],
            runbook_suggestion: "generic".into(),
        }
    }

    #[test]
    fn prod_outage_raises_to_p2() {
        let inc = incident(
            Environment::Prod,
            "Production API outage - users cannot login",
            "",
        );
        let v = verdict(IncidentCategory::Application, Severity::P4, 0.9);
        let result = evaluate(&inc, &v);
        assert_eq!(result.final_severity, Severity::P2);
        assert!(result.overridden);
        assert!(result.labels.contains(&"sev:P2".to_string()));
    }

    #[test]
    fn staging_caps_to_p3() {
        let inc = incident(Environment::Staging, "Staging database connection failures", "");
        let v = verdict(IncidentCategory::Database, Severity::P1, 0.9);
        let result = evaluate(&inc, &v);
        assert_eq!(result.final_severity, Severity::P3);
        assert!(result.override_reason.unwrap().contains("non-production"));
    }

    #[test]
    fn prod_security_forces_p1_even_with_outage_keywords() {
        let inc = incident(Environment::Prod, "Potential security breach, service down", "");
        let v = verdict(IncidentCategory::Security, Severity::P3, 0.9);
        let result = evaluate(&inc, &v);
        assert_eq!(result.final_severity, Severity::P1);
    }

    #[test]
    fn low_confidence_sets_review_without_changing_severity() {
        let inc = incident(Environment::Prod, "Minor blip", "");
        let v = verdict(IncidentCategory::Application, Severity::P4, 0.5);
        let result = evaluate(&inc, &v);
        assert_eq!(result.final_severity, Severity::P4);
        assert!(result.needs_human_review);
        assert!(result.labels.contains(&"needs-review".to_string()));
    }

    #[test]
    fn labels_always_include_autopilot_type_and_sev() {
        let inc = incident(Environment::Dev, "x", "y");
        let v = verdict(IncidentCategory::Network, Severity::P2, 0.95);
        let result = evaluate(&inc, &v);
        assert!(result.labels.contains(&"autopilot".to_string()));
        assert!(result.labels.contains(&"type:network".to_string()));
        assert!(result.labels.iter().any(|l| l.starts_with("sev:")));
    }

    #[test]
    fn property_non_prod_final_severity_is_p3_or_p4() {
        for env in [Environment::Staging, Environment::Dev, Environment::Unknown] {
            for sev in [Severity::P1, Severity::P2, Severity::P3, Severity::P4] {
                let inc = incident(env, "anything", "anything");
                let v = verdict(IncidentCategory::Unknown, sev, 0.8);
                let result = evaluate(&inc, &v);
                assert!(matches!(result.final_severity, Severity::P3 | Severity::P4));
            }
        }
    }

    #[test]
    fn property_prod_security_keyword_always_p1() {
        for sev in [Severity::P1, Severity::P2, Severity::P3, Severity::P4] {
            let inc = incident(Environment::Prod, "unauthorized access detected", "");
            let v = verdict(IncidentCategory::Security, sev, 0.8);
            let result = evaluate(&inc, &v);
            assert_eq!(result.final_severity, Severity::P1);
        }
    }
}
