//! Parses a raw LLM completion into a validated [`LlmVerdict`].
//!
//! The provider is never trusted to emit well-formed JSON or to respect the
//! closed category/severity enums, so every field is defensively coerced
//! rather than rejected outright — a malformed value degrades the verdict,
//! it does not fail the call.

use crate::error::{Error, Result};
use autopilot_core::types::{IncidentCategory, LlmVerdict, Severity};
use serde_json::Value;

const MAX_FIRST_ACTIONS: usize = 7;

/// Strip a leading/trailing triple-backtick fence (with or without a
/// language tag) if present, then parse and coerce into an [`LlmVerdict`].
pub fn parse_verdict(raw: &str) -> Result<LlmVerdict> {
    let stripped = strip_fence(raw);
    let value: Value = serde_json::from_str(stripped)
        .map_err(|err| Error::Parse(format!("invalid json: {err}")))?;

    let category = IncidentCategory::coerce(&scalar_string(&value, "category"));
    let severity = Severity::coerce(&scalar_string(&value, "severity"));
    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);
    let owner_team = scalar_string(&value, "owner_team");
    let summary = scalar_string(&value, "summary");
    let runbook_suggestion = scalar_string(&value, "runbook_suggestion");

    let mut first_actions: Vec<String> = value
        .get("first_actions")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(stringify_scalar).collect())
        .unwrap_or_default();
    first_actions.truncate(MAX_FIRST_ACTIONS);

    Ok(LlmVerdict {
        category,
        severity,
        confidence,
        owner_team,
        summary,
        first_actions,
        runbook_suggestion,
    })
}

fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches('\n');
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn scalar_string(value: &Value, key: &str) -> String {
    value.get(key).map(stringify_scalar).unwrap_or_default()
}

fn stringify_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let raw = r#"{"category":"database","severity":"p1","confidence":0.92,
            "owner_team":"db-oncall","summary":"replica lag","first_actions":["check replicas"],
            "runbook_suggestion":"db-failover"}"#;
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict.category, IncidentCategory::Database);
        assert_eq!(verdict.severity, Severity::P1);
        assert_eq!(verdict.confidence, 0.92);
        assert_eq!(verdict.first_actions, vec!["check replicas"]);
    }

    #[test]
    fn strips_fenced_json() {
        let raw = "```json\n{\"category\":\"network\",\"severity\":\"p3\",\"confidence\":0.5}\n```";
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict.category, IncidentCategory::Network);
        assert_eq!(verdict.severity, Severity::P3);
    }

    #[test]
    fn unknown_category_and_severity_default_safely() {
        let raw = r#"{"category":"who-knows","severity":"urgent!!","confidence":1.4}"#;
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict.category, IncidentCategory::Unknown);
        assert_eq!(verdict.severity, Severity::P4);
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn first_actions_truncated_to_seven() {
        let actions: Vec<String> = (0..12).map(|i| format!("step {i}")).collect();
        let raw = serde_json::json!({
            "category": "application",
            "severity": "p2",
            "confidence": 0.8,
            "first_actions": actions,
        })
        .to_string();
        let verdict = parse_verdict(&raw).unwrap();
        assert_eq!(verdict.first_actions.len(), 7);
    }

    #[test]
    fn non_string_scalars_are_stringified() {
        let raw = r#"{"category":"network","severity":"p2","confidence":0.6,"owner_team":42}"#;
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict.owner_team, "42");
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = parse_verdict("not json").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
