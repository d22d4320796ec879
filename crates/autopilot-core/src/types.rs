//! Core domain types shared across the triage pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordinal incident severity, most to least severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Most severe.
    P1,
    P2,
    P3,
    /// Least severe.
    P4,
}

impl Severity {
    /// Weight used by the risk scorer.
    pub fn weight(self) -> f64 {
        match self {
            Self::P1 => 1.0,
            Self::P2 => 0.75,
            Self::P3 => 0.5,
            Self::P4 => 0.25,
        }
    }

    /// Parse a free-text severity token, defaulting unknown values to P4.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "P1" => Self::P1,
            "P2" => Self::P2,
            "P3" => Self::P3,
            _ => Self::P4,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
        };
        write!(f, "{s}")
    }
}

/// Closed set of incident categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    Deployment,
    Database,
    Network,
    Application,
    Security,
    Infrastructure,
    Unknown,
}

impl IncidentCategory {
    /// Coerce a free-text category to the closed enum, defaulting to `unknown`.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "deployment" => Self::Deployment,
            "database" => Self::Database,
            "network" => Self::Network,
            "application" => Self::Application,
            "security" => Self::Security,
            "infrastructure" => Self::Infrastructure,
            _ => Self::Unknown,
        }
    }

    /// Lowercase snake_case label, used in policy labels and runbook lookups.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::Database => "database",
            Self::Network => "network",
            Self::Application => "application",
            Self::Security => "security",
            Self::Infrastructure => "infrastructure",
            Self::Unknown => "unknown",
        }
    }
}

/// Deployment environment, inferred by the normalizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Prod,
    Staging,
    Dev,
    Unknown,
}

impl Environment {
    /// Weight used by the risk scorer.
    pub fn weight(self) -> f64 {
        match self {
            Self::Prod => 1.0,
            Self::Staging => 0.5,
            Self::Dev => 0.25,
            Self::Unknown => 0.5,
        }
    }
}

/// A normalized incident record, immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Unique key from the originating ticketing system.
    pub external_key: String,
    /// Short title/summary.
    pub title: String,
    /// Long-form description, plain text (ADF already extracted).
    pub description: String,
    /// Free-text labels attached to the source issue.
    pub labels: Vec<String>,
    /// Component name, `"unknown"` when absent.
    pub component: String,
    /// Inferred deployment environment.
    pub environment: Environment,
    /// Reporter identity, `"unknown"` when absent.
    pub reporter: String,
    /// UTC creation instant.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Original ingest payload, retained for audit.
    pub raw_payload: serde_json::Value,
}

impl Incident {
    /// Concatenation of title and description, used by keyword-matching rules.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Verdict produced by the LLM adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmVerdict {
    /// Classified category.
    pub category: IncidentCategory,
    /// Classified severity, prior to policy guardrails.
    pub severity: Severity,
    /// Confidence in [0,1].
    pub confidence: f64,
    /// Suggested owning team.
    pub owner_team: String,
    /// Short human summary.
    pub summary: String,
    /// Ordered first actions, 3-7 entries.
    pub first_actions: Vec<String>,
    /// Suggested runbook name/id, as proposed by the LLM (advisory only).
    pub runbook_suggestion: String,
}

/// Output of the policy engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVerdict {
    /// Severity as emitted by the LLM, prior to any guardrail.
    pub original_severity: Severity,
    /// Severity as committed after guardrails.
    pub final_severity: Severity,
    /// Whether any rule changed the severity.
    pub overridden: bool,
    /// Human-readable reason for the override, if any.
    pub override_reason: Option<String>,
    /// Whether the confidence gate fired.
    pub needs_human_review: bool,
    /// LLM confidence, passed through unchanged.
    pub confidence: f64,
    /// Labels to attach to the ticket.
    pub labels: Vec<String>,
}

/// Status of an audited action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Failure,
    Skipped,
    NoMatch,
    Flagged,
    Applied,
}

/// A single audit trail entry. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// UTC timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Closed event type (`webhook`, `normalization`, `correlation`, ...).
    pub event_type: String,
    /// Action taken within that event type.
    pub action: String,
    /// Outcome of the action.
    pub status: AuditStatus,
    /// External key of the incident, if applicable.
    pub external_key: Option<String>,
    /// Component, if applicable.
    pub component: Option<String>,
    /// Severity string, if applicable.
    pub severity: Option<String>,
    /// Structured, arbitrary details.
    pub details: HashMap<String, serde_json::Value>,
    /// Whether this event was produced under dry-run.
    pub dry_run: bool,
}

impl AuditEvent {
    /// Build an audit event with the global clock and dry-run flag applied.
    pub fn new(event_type: &str, action: &str, status: AuditStatus, dry_run: bool) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type: event_type.to_string(),
            action: action.to_string(),
            status,
            external_key: None,
            component: None,
            severity: None,
            details: HashMap::new(),
            dry_run,
        }
    }

    /// Attach the incident's external key.
    pub fn with_external_key(mut self, key: impl Into<String>) -> Self {
        self.external_key = Some(key.into());
        self
    }

    /// Attach the incident's component.
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Attach a severity string.
    pub fn with_severity(mut self, severity: impl ToString) -> Self {
        self.severity = Some(severity.to_string());
        self
    }

    /// Attach a structured detail.
    pub fn with_detail(mut self, key: &str, value: serde_json::Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}

/// A correlation record: the minimal projection of an incident kept for
/// same-component similarity lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationRecord {
    /// External key, unique; insertion is upsert.
    pub external_key: String,
    /// Title used for similarity comparison.
    pub summary: String,
    /// Component name.
    pub component: String,
    /// Environment.
    pub environment: Environment,
    /// UTC creation instant.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Lifecycle status of a stored web incident.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WebIncidentStatus {
    Pending,
    Triaged,
    Approved,
    Rejected,
    Overridden,
    Resolved,
}

impl WebIncidentStatus {
    /// Parse a free-text status filter (as supplied on `?status=`), case
    /// insensitively. `None` on an unrecognized value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "triaged" => Some(Self::Triaged),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "overridden" => Some(Self::Overridden),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }

    /// Lowercase token, as stored and as emitted in API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Triaged => "triaged",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Overridden => "overridden",
            Self::Resolved => "resolved",
        }
    }
}

/// A stored web-submitted incident with mutable lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebIncident {
    /// Generated id, primary key in the store.
    pub id: String,
    /// The normalized incident as originally submitted.
    pub incident: Incident,
    /// Current lifecycle status.
    pub status: WebIncidentStatus,
    /// Triage result, present once triaged.
    pub policy_verdict: Option<PolicyVerdict>,
    /// LLM verdict backing the policy verdict, if triaged.
    pub llm_verdict: Option<LlmVerdict>,
    /// Severity prior to the first override, preserved across subsequent ones.
    pub original_severity: Option<Severity>,
    /// Human author of the last decision, if any.
    pub decision_author: Option<String>,
    /// UTC time of the last decision, if any.
    pub decision_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Human note attached to the last decision, if any.
    pub decision_note: Option<String>,
}
