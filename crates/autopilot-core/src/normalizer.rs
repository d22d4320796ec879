//! Webhook payload normalization, including ADF text extraction and
//! environment inference from free text.

use crate::error::{Error, Result};
use crate::types::{Environment, Incident};
use once_cell::sync::Lazy;
use regex::RegexSet;
use serde_json::Value;

/// Outcome of attempting to normalize a webhook payload.
pub enum NormalizeOutcome {
    /// A normalized incident.
    Incident(Incident),
    /// The payload's issue type was not `incident`; not an error.
    NotAnIncident,
}

struct EnvPatterns {
    prod: RegexSet,
    staging: RegexSet,
    dev: RegexSet,
}

static ENV_PATTERNS: Lazy<EnvPatterns> = Lazy::new(|| {
    let word = |words: &[&str]| -> RegexSet {
        let patterns: Vec<String> =
            words.iter().map(|w| format!(r"(?i)\b{}\b", regex::escape(w))).collect();
        RegexSet::new(patterns).expect("static environment patterns are valid regexes")
    };
    EnvPatterns {
        prod: word(&["prod", "production", "prd", "live"]),
        staging: word(&["staging", "stage", "stg", "uat", "preprod", "pre-prod"]),
        dev: word(&["dev", "development", "qa", "local", "sandbox"]),
    }
});

/// Infer the deployment environment from the concatenation of an incident's
/// free-text fields. First matching family wins, in order {prod, staging, dev}.
pub fn infer_environment(text: &str) -> Environment {
    if ENV_PATTERNS.prod.is_match(text) {
        Environment::Prod
    } else if ENV_PATTERNS.staging.is_match(text) {
        Environment::Staging
    } else if ENV_PATTERNS.dev.is_match(text) {
        Environment::Dev
    } else {
        Environment::Unknown
    }
}

/// Extract plain text from an Atlassian Document Format (or similarly
/// shaped) structured document using an explicit stack, so that adversarial
/// nesting cannot blow the call stack.
pub fn extract_adf_text(doc: &Value) -> String {
    // Frames carry the node's children and the next child index to visit,
    // so siblings are expanded in document order without recursion.
    let mut pieces: Vec<String> = Vec::new();
    let mut frames: Vec<(&[Value], usize)> = Vec::new();

    let mut current = doc;
    loop {
        if current.get("type").and_then(Value::as_str) == Some("text") {
            if let Some(text) = current.get("text").and_then(Value::as_str) {
                pieces.push(text.to_string());
            }
        } else if let Some(children) = current.get("content").and_then(Value::as_array) {
            frames.push((children.as_slice(), 0));
        }

        loop {
            match frames.last_mut() {
                Some((children, idx)) if *idx < children.len() => {
                    current = &children[*idx];
                    *idx += 1;
                    break;
                }
                Some(_) => {
                    frames.pop();
                }
                None => return pieces.join(" "),
            }
        }
    }
}

/// Build a normalized incident directly from web-form fields, applying the
/// same defaults and ADF/environment handling as the webhook path. Used by
/// the `/api/incidents` create handler, which has no issue-type gate to
/// pass through.
#[allow(clippy::too_many_arguments)]
pub fn build_incident(
    external_key: String,
    title: String,
    description: &Value,
    labels: Vec<String>,
    component: Option<String>,
    reporter: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
) -> Incident {
    let description = description_text(description);
    let component = component.filter(|c| !c.is_empty()).unwrap_or_else(|| "unknown".to_string());
    let reporter = reporter.filter(|r| !r.is_empty()).unwrap_or_else(|| "unknown".to_string());

    let env_text = format!("{} {} {} {}", title, description, labels.join(" "), component);
    let environment = infer_environment(&env_text);

    Incident {
        external_key: external_key.clone(),
        title,
        description,
        labels,
        component,
        environment,
        reporter,
        created_at,
        raw_payload: serde_json::json!({ "source": "web", "id": external_key }),
    }
}

fn description_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(_) => extract_adf_text(value),
        other => other.to_string(),
    }
}

fn field_str<'a>(fields: &'a Value, name: &str) -> Option<&'a str> {
    fields.get(name).and_then(Value::as_str)
}

/// Normalize a heterogeneous webhook payload into an internal incident.
pub fn normalize(payload: &Value) -> Result<NormalizeOutcome> {
    let fields = payload.get("fields").unwrap_or(payload);

    let issue_type = fields
        .get("issuetype")
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .or_else(|| field_str(fields, "issue_type"))
        .unwrap_or("");

    if issue_type.to_ascii_lowercase() != "incident" {
        return Ok(NormalizeOutcome::NotAnIncident);
    }

    let external_key = payload
        .get("key")
        .and_then(Value::as_str)
        .or_else(|| field_str(fields, "key"))
        .or_else(|| field_str(fields, "external_key"))
        .ok_or_else(|| Error::normalization("payload missing external key"))?
        .to_string();

    let title = field_str(fields, "summary")
        .or_else(|| field_str(fields, "title"))
        .unwrap_or_default()
        .to_string();

    let description = fields
        .get("description")
        .map(description_text)
        .unwrap_or_default();

    let labels: Vec<String> = fields
        .get("labels")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let component = fields
        .get("components")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .or_else(|| field_str(fields, "component"))
        .unwrap_or("unknown")
        .to_string();

    let reporter = fields
        .get("reporter")
        .and_then(|v| v.get("displayName"))
        .and_then(Value::as_str)
        .or_else(|| field_str(fields, "reporter"))
        .unwrap_or("unknown")
        .to_string();

    let created_at = fields
        .get("created")
        .and_then(Value::as_str)
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(chrono::Utc::now);

    let env_text = format!("{} {} {} {}", title, description, labels.join(" "), component);
    let environment = infer_environment(&env_text);

    Ok(NormalizeOutcome::Incident(Incident {
        external_key,
        title,
        description,
        labels,
        component,
        environment,
        reporter,
        created_at,
        raw_payload: payload.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn incident_payload(summary: &str, labels: Vec<&str>, component: &str) -> Value {
        json!({
            "key": "OPS-1",
            "fields": {
                "issuetype": {"name": "Incident"},
                "summary": summary,
                "description": "details",
                "labels": labels,
                "components": [{"name": component}],
                "reporter": {"displayName": "alice"},
            }
        })
    }

    #[test]
    fn non_incident_is_skip_not_error() {
        let payload = json!({"fields": {"issuetype": {"name": "Story"}}});
        match normalize(&payload).unwrap() {
            NormalizeOutcome::NotAnIncident => {}
            _ => panic!("expected skip"),
        }
    }

    #[test]
    fn defaults_apply_for_missing_fields() {
        let payload = json!({
            "key": "OPS-2",
            "fields": {"issuetype": {"name": "incident"}, "summary": "x"}
        });
        let NormalizeOutcome::Incident(incident) = normalize(&payload).unwrap() else {
            panic!("expected incident");
        };
        assert_eq!(incident.component, "unknown");
        assert_eq!(incident.reporter, "unknown");
        assert_eq!(incident.description, "");
    }

    #[test]
    fn adf_description_is_flattened_in_order() {
        let adf = json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "Hello"},
                    {"type": "text", "text": "world"}
                ]}
            ]
        });
        assert_eq!(extract_adf_text(&adf), "Hello world");
    }

    #[test]
    fn environment_inference_prefers_prod_first() {
        let env = infer_environment("Production outage in staging-like wording but prod present");
        assert_eq!(env, Environment::Prod);
    }

    #[test]
    fn environment_aliases_are_recognized() {
        assert_eq!(infer_environment("issue in prd cluster"), Environment::Prod);
        assert_eq!(infer_environment("uat smoke test failing"), Environment::Staging);
        assert_eq!(infer_environment("local sandbox repro"), Environment::Dev);
        assert_eq!(infer_environment("no hints here"), Environment::Unknown);
    }

    #[test]
    fn build_incident_applies_same_defaults_as_webhook_path() {
        let incident = build_incident(
            "wi-1".to_string(),
            "Checkout errors".to_string(),
            &json!("prod checkout is throwing 500s"),
            vec!["prod".to_string()],
            None,
            None,
            chrono::Utc::now(),
        );
        assert_eq!(incident.component, "unknown");
        assert_eq!(incident.reporter, "unknown");
        assert_eq!(incident.environment, Environment::Prod);
    }

    #[test]
    fn normalizer_is_idempotent_modulo_created_at() {
        let payload = incident_payload("Payments API 500s", vec!["prod"], "payments");
        let NormalizeOutcome::Incident(a) = normalize(&payload).unwrap() else { panic!() };
        let NormalizeOutcome::Incident(b) = normalize(&payload).unwrap() else { panic!() };
        assert_eq!(a.external_key, b.external_key);
        assert_eq!(a.title, b.title);
        assert_eq!(a.description, b.description);
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.component, b.component);
        assert_eq!(a.environment, b.environment);
    }
}
