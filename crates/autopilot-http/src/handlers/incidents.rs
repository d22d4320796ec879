//! Web-UI incident endpoints: create, list, fetch, triage and the human
//! decision transitions (approve / reject / override / resolve), plus the
//! post-incident-review generator and the per-incident audit trail.
//!
//! Unlike the webhook pipeline, incidents created here have no correlation
//! record and no ticketing/chat fan-out — they are reviewed and decided by
//! a human through this API, with the LLM adapter and policy engine reused
//! as-is for the triage step.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use autopilot_core::normalizer::build_incident;
use autopilot_core::policy::{apply_human_override, evaluate};
use autopilot_core::risk;
use autopilot_core::runbook::RunbookMatch;
use autopilot_core::types::{
    AuditEvent, AuditStatus, IncidentCategory, PolicyVerdict, Severity, WebIncident,
    WebIncidentStatus,
};
use autopilot_llm::TriageProvider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::state::AppState;

const DEMO_TOKEN_HEADER: &str = "x-demo-token";

/// Body of `POST /api/incidents`.
#[derive(Debug, Deserialize)]
pub struct IncidentCreate {
    /// Short title.
    pub title: String,
    /// Description, either a plain string or a structured document.
    #[serde(default)]
    pub description: Value,
    /// Component name, defaults to `"unknown"`.
    pub component: Option<String>,
    /// Free-text labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Reporter identity, defaults to `"unknown"`.
    pub reporter: Option<String>,
}

/// Query parameters for `GET /api/incidents`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Optional status filter.
    pub status: Option<String>,
    /// Page size, default 20.
    pub limit: Option<i64>,
    /// Page offset, default 0.
    pub offset: Option<i64>,
}

/// Body of `POST /api/incidents/{id}/override`.
#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    /// New severity, if the human is changing it.
    pub severity: Option<String>,
    /// New category, if the human is changing it.
    pub category: Option<String>,
    /// Mandatory human-readable justification.
    pub reason: String,
}

/// Body of `POST /api/incidents/{id}/resolve`.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// Free-text resolution note.
    pub resolution_note: String,
}

/// Body of `POST /api/incidents/{id}/reject`.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Reason the triage verdict was rejected.
    pub reason: String,
}

/// Body of `POST /api/incidents/{id}/approve`.
#[derive(Debug, Deserialize, Default)]
pub struct ApproveRequest {
    /// Optional note attached to the approval.
    pub note: Option<String>,
}

/// Response envelope used by every incident endpoint that returns the full
/// stored record.
#[derive(Debug, Serialize)]
pub struct IncidentResponse {
    #[serde(flatten)]
    incident: WebIncident,
    /// Risk score for the current committed severity, if triaged.
    risk_score: Option<f64>,
    /// Risk band for display, if triaged.
    risk_band: Option<String>,
    /// Best-matching runbook for the committed category, if triaged.
    primary_runbook: Option<RunbookMatch>,
    /// Next-best runbook matches, ranked, after the primary.
    alternative_runbooks: Vec<RunbookMatch>,
}

/// Category committed by the policy verdict, read back off its `type:`
/// label so it reflects a human override rather than the original LLM call.
fn committed_category(verdict: &PolicyVerdict) -> IncidentCategory {
    verdict
        .labels
        .iter()
        .find_map(|l| l.strip_prefix("type:"))
        .map(IncidentCategory::coerce)
        .unwrap_or(IncidentCategory::Unknown)
}

fn respond(state: &AppState, incident: WebIncident) -> IncidentResponse {
    let scoring = incident.policy_verdict.as_ref().map(|verdict| {
        let score = risk::score(verdict.final_severity, verdict.confidence, incident.incident.environment);
        (score, risk::band(score).to_string())
    });
    let (primary_runbook, alternative_runbooks) = match incident.policy_verdict.as_ref() {
        Some(verdict) => state.runbooks.best_matches(
            committed_category(verdict),
            &incident.incident.title,
            &incident.incident.description,
        ),
        None => (None, Vec::new()),
    };
    IncidentResponse {
        incident,
        risk_score: scoring.as_ref().map(|(s, _)| *s),
        risk_band: scoring.map(|(_, b)| b),
        primary_runbook,
        alternative_runbooks,
    }
}

async fn audit(state: &AppState, event: AuditEvent) {
    state.audit.record(&event).await;
}

/// `POST /api/incidents` — create a pending web-submitted incident.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<IncidentCreate>,
) -> Result<Json<IncidentResponse>> {
    if body.title.trim().is_empty() {
        return Err(Error::BadRequest("title must not be empty".to_string()));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let incident = build_incident(
        id.clone(),
        body.title,
        &body.description,
        body.labels,
        body.component,
        body.reporter,
        chrono::Utc::now(),
    );

    let stored = WebIncident {
        id: id.clone(),
        incident,
        status: WebIncidentStatus::Pending,
        policy_verdict: None,
        llm_verdict: None,
        original_severity: None,
        decision_author: None,
        decision_at: None,
        decision_note: None,
    };

    state.store.insert_web_incident(&stored).await?;
    audit(
        &state,
        AuditEvent::new("incident_created", "create", AuditStatus::Success, state.config.dry_run)
            .with_external_key(&id)
            .with_component(&stored.incident.component),
    )
    .await;

    Ok(Json(respond(&state, stored)))
}

/// `GET /api/incidents` — paginated listing, newest first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<IncidentResponse>>> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            WebIncidentStatus::parse(raw)
                .ok_or_else(|| Error::BadRequest(format!("unknown status filter: {raw}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(20).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let incidents = state.store.list_web_incidents(status, limit, offset).await?;
    Ok(Json(incidents.into_iter().map(|i| respond(&state, i)).collect()))
}

/// `GET /api/incidents/{id}` — fetch a single stored incident.
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<IncidentResponse>> {
    let incident = state.store.get_web_incident(&id).await?.ok_or(Error::NotFound)?;
    Ok(Json(respond(&state, incident)))
}

/// `POST /api/incidents/{id}/triage` — run AI triage and commit a policy
/// verdict. Allowed from `pending` (first triage) or `rejected` (re-triage).
pub async fn triage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<IncidentResponse>> {
    let mut incident = state.store.get_web_incident(&id).await?.ok_or(Error::NotFound)?;

    if !matches!(incident.status, WebIncidentStatus::Pending | WebIncidentStatus::Rejected) {
        return Err(Error::BadRequest(format!(
            "cannot triage an incident in status {}",
            incident.status.as_str()
        )));
    }

    let use_mock = state.config.llm_provider_is_mock()
        || !demo_token_matches(&headers, state.config.demo_token.as_deref());

    let verdict = if use_mock {
        autopilot_llm::mock::triage(&incident.incident)
    } else {
        match state.llm.triage(&incident.incident).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(error = %err, incident = %id, "web-UI triage failed");
                audit(
                    &state,
                    AuditEvent::new("incident_triage_failed", "triage", AuditStatus::Failure, state.config.dry_run)
                        .with_external_key(&id)
                        .with_detail("error", serde_json::json!(err.to_string())),
                )
                .await;
                return Err(Error::Triage(err));
            }
        }
    };

    let policy_verdict = evaluate(&incident.incident, &verdict);
    incident.status = WebIncidentStatus::Triaged;
    incident.llm_verdict = Some(verdict);
    incident.policy_verdict = Some(policy_verdict.clone());
    state.store.update_web_incident(&incident).await?;

    info!(incident = %id, severity = %policy_verdict.final_severity, "web-UI incident triaged");
    audit(
        &state,
        AuditEvent::new("incident_triaged", "triage", AuditStatus::Success, state.config.dry_run)
            .with_external_key(&id)
            .with_severity(policy_verdict.final_severity),
    )
    .await;

    Ok(Json(respond(&state, incident)))
}

fn demo_token_matches(headers: &HeaderMap, configured: Option<&str>) -> bool {
    let Some(configured) = configured else { return false };
    headers
        .get(DEMO_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| provided == configured)
}

/// `POST /api/incidents/{id}/approve` — commit the triage verdict as-is.
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ApproveRequest>,
) -> Result<Json<IncidentResponse>> {
    let mut incident = require_triaged(&state, &id).await?;

    incident.status = WebIncidentStatus::Approved;
    incident.decision_author = Some("web-ui".to_string());
    incident.decision_at = Some(chrono::Utc::now());
    incident.decision_note = body.note;
    state.store.update_web_incident(&incident).await?;

    audit(
        &state,
        AuditEvent::new("incident_approved", "approve", AuditStatus::Applied, state.config.dry_run)
            .with_external_key(&id),
    )
    .await;

    Ok(Json(respond(&state, incident)))
}

/// `POST /api/incidents/{id}/reject` — send a triaged incident back for
/// re-triage, recording the human's reason via the generic decision event
/// (there is no dedicated `incident_rejected` audit type).
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<IncidentResponse>> {
    let mut incident = require_triaged(&state, &id).await?;

    incident.status = WebIncidentStatus::Rejected;
    incident.decision_author = Some("web-ui".to_string());
    incident.decision_at = Some(chrono::Utc::now());
    incident.decision_note = Some(body.reason.clone());
    state.store.update_web_incident(&incident).await?;

    audit(
        &state,
        AuditEvent::new("incident_decision", "reject", AuditStatus::Applied, state.config.dry_run)
            .with_external_key(&id)
            .with_detail("reason", serde_json::json!(body.reason)),
    )
    .await;

    Ok(Json(respond(&state, incident)))
}

async fn require_triaged(state: &AppState, id: &str) -> Result<WebIncident> {
    let incident = state.store.get_web_incident(id).await?.ok_or(Error::NotFound)?;
    if incident.status != WebIncidentStatus::Triaged {
        return Err(Error::BadRequest(format!(
            "cannot decide an incident in status {}",
            incident.status.as_str()
        )));
    }
    Ok(incident)
}

/// `POST /api/incidents/{id}/override` — human-overrule the committed
/// severity and/or category. Preserves the pre-override severity the first
/// time an override occurs.
pub async fn override_verdict(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<OverrideRequest>,
) -> Result<Json<IncidentResponse>> {
    let mut incident = require_triaged(&state, &id).await?;
    let previous = incident
        .policy_verdict
        .clone()
        .ok_or_else(|| Error::BadRequest("incident has no triage verdict to override".to_string()))?;

    let new_severity =
        body.severity.as_deref().map(Severity::coerce);
    let new_category = body.category.as_deref().map(IncidentCategory::coerce);
    if new_severity.is_none() && new_category.is_none() {
        return Err(Error::BadRequest("override requires a new severity and/or category".to_string()));
    }

    let overridden = apply_human_override(&previous, new_severity, new_category, &body.reason);

    if incident.original_severity.is_none() {
        incident.original_severity = Some(previous.final_severity);
    }
    incident.status = WebIncidentStatus::Overridden;
    incident.policy_verdict = Some(overridden.clone());
    incident.decision_author = Some("web-ui".to_string());
    incident.decision_at = Some(chrono::Utc::now());
    incident.decision_note = Some(body.reason.clone());
    state.store.update_web_incident(&incident).await?;

    audit(
        &state,
        AuditEvent::new("incident_overridden", "override", AuditStatus::Applied, state.config.dry_run)
            .with_external_key(&id)
            .with_severity(overridden.final_severity)
            .with_detail("reason", serde_json::json!(body.reason)),
    )
    .await;

    Ok(Json(respond(&state, incident)))
}

/// `POST /api/incidents/{id}/resolve` — terminal transition from any
/// non-resolved status. A `pending` incident must be triaged first: every
/// resolved incident must carry a triage result, so a direct close from
/// `pending` is rejected rather than silently skipping triage.
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<IncidentResponse>> {
    let mut incident = state.store.get_web_incident(&id).await?.ok_or(Error::NotFound)?;
    if incident.status == WebIncidentStatus::Resolved {
        return Err(Error::BadRequest("incident is already resolved".to_string()));
    }
    if incident.policy_verdict.is_none() {
        return Err(Error::BadRequest(
            "cannot resolve an untriaged incident; triage it first".to_string(),
        ));
    }

    incident.status = WebIncidentStatus::Resolved;
    incident.decision_author = Some("web-ui".to_string());
    incident.decision_at = Some(chrono::Utc::now());
    incident.decision_note = Some(body.resolution_note);
    state.store.update_web_incident(&incident).await?;

    audit(
        &state,
        AuditEvent::new("incident_resolved", "resolve", AuditStatus::Applied, state.config.dry_run)
            .with_external_key(&id),
    )
    .await;

    Ok(Json(respond(&state, incident)))
}

/// `POST /api/incidents/{id}/pir` — render a post-incident-review document
/// from the stored incident, its committed verdict and its audit trail.
/// Only meaningful once an incident has reached a decision, so this
/// requires `resolved`.
pub async fn pir(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let incident = state.store.get_web_incident(&id).await?.ok_or(Error::NotFound)?;
    if incident.status != WebIncidentStatus::Resolved {
        return Err(Error::BadRequest("post-incident review requires a resolved incident".to_string()));
    }

    let audit_trail = state.store.get_audit_events_for(&id).await?;
    let document = render_pir(&incident, &audit_trail);

    audit(
        &state,
        AuditEvent::new("pir_generated", "generate", AuditStatus::Success, state.config.dry_run)
            .with_external_key(&id),
    )
    .await;

    Ok(Json(serde_json::json!({ "incident_id": id, "markdown": document })))
}

fn render_pir(incident: &WebIncident, audit_trail: &[AuditEvent]) -> String {
    let mut doc = String::new();
    doc.push_str(&format!("# Post-Incident Review: {}\n\n", incident.incident.title));
    doc.push_str(&format!("- **Component**: {}\n", incident.incident.component));
    doc.push_str(&format!("- **Environment**: {:?}\n", incident.incident.environment));
    doc.push_str(&format!("- **Reporter**: {}\n", incident.incident.reporter));

    if let Some(PolicyVerdict { original_severity, final_severity, overridden, override_reason, .. }) =
        &incident.policy_verdict
    {
        doc.push_str(&format!("- **Original severity**: {original_severity}\n"));
        doc.push_str(&format!("- **Final severity**: {final_severity}\n"));
        if *overridden {
            doc.push_str(&format!(
                "- **Override reason**: {}\n",
                override_reason.as_deref().unwrap_or("n/a")
            ));
        }
    }

    if let Some(note) = &incident.decision_note {
        doc.push_str(&format!("\n## Resolution\n\n{note}\n"));
    }

    doc.push_str("\n## Timeline\n\n");
    for event in audit_trail.iter().rev() {
        doc.push_str(&format!(
            "- {} — {}.{} ({:?})\n",
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.action,
            event.status
        ));
    }

    doc
}

/// `GET /api/incidents/{id}/audit` — the full audit trail for one incident.
pub async fn audit_trail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AuditEvent>>> {
    state.store.get_web_incident(&id).await?.ok_or(Error::NotFound)?;
    let events = state.store.get_audit_events_for(&id).await?;
    Ok(Json(events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_token_requires_exact_match() {
        let mut headers = HeaderMap::new();
        headers.insert(DEMO_TOKEN_HEADER, "secret".parse().unwrap());
        assert!(demo_token_matches(&headers, Some("secret")));
        assert!(!demo_token_matches(&headers, Some("other")));
        assert!(!demo_token_matches(&HeaderMap::new(), Some("secret")));
        assert!(!demo_token_matches(&headers, None));
    }

    #[test]
    fn pir_includes_override_reason_when_overridden() {
        let incident = WebIncident {
            id: "wi-1".into(),
            incident: autopilot_core::types::Incident {
                external_key: "wi-1".into(),
                title: "Checkout errors".into(),
                description: "d".into(),
                labels: vec![],
                component: "checkout".into(),
                environment: autopilot_core::types::Environment::Prod,
                reporter: "unknown".into(),
                created_at: chrono::Utc::now(),
                raw_payload: serde_json::json!({}),
            },
            status: WebIncidentStatus::Resolved,
            policy_verdict: Some(PolicyVerdict {
                original_severity: Severity::P3,
                final_severity: Severity::P1,
                overridden: true,
                override_reason: Some("escalated by on-call".into()),
                needs_human_review: false,
                confidence: 0.9,
                labels: vec![],
            }),
            llm_verdict: None,
            original_severity: Some(Severity::P3),
            decision_author: Some("web-ui".into()),
            decision_at: Some(chrono::Utc::now()),
            decision_note: Some("rolled back bad deploy".into()),
        };
        let doc = render_pir(&incident, &[]);
        assert!(doc.contains("escalated by on-call"));
        assert!(doc.contains("rolled back bad deploy"));
    }
}
