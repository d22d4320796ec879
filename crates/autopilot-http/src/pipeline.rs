//! Webhook ingest orchestration: the sequential ingest → normalize →
//! correlate → LLM → policy → audit → fan-out pipeline. Authentication and
//! rate limiting happen in middleware before this driver ever runs.

use autopilot_core::correlator::correlate;
use autopilot_core::normalizer::{normalize, NormalizeOutcome};
use autopilot_core::policy::evaluate;
use autopilot_core::runbook::RunbookMatch;
use autopilot_core::types::{AuditEvent, AuditStatus, CorrelationRecord, Incident, PolicyVerdict};
use autopilot_llm::TriageProvider;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::state::AppState;

/// Response body for a webhook ingest call.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// `processed` or `skipped`.
    pub status: String,
    /// External key of the incident, if one was normalized.
    pub external_key: Option<String>,
    /// Committed severity, if triaged.
    pub severity: Option<String>,
    /// Classified category, if triaged.
    pub category: Option<String>,
    /// Human-readable summary of the outcome.
    pub message: String,
    /// Best-matching runbook for the committed category, if any.
    pub primary_runbook: Option<RunbookMatch>,
    /// Next-best runbook matches, ranked, after the primary.
    pub alternative_runbooks: Vec<RunbookMatch>,
}

/// Run the full ingest pipeline for a raw webhook payload.
pub async fn run_webhook_ingest(state: &AppState, payload: Value) -> Result<WebhookResponse> {
    state.metrics.inc_webhooks_received();

    let outcome = match normalize(&payload) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "normalization failed");
            audit(
                state,
                AuditEvent::new("normalization", "normalize", AuditStatus::Failure, state.config.dry_run)
                    .with_detail("error", serde_json::json!(err.to_string())),
            )
            .await;
            return Err(Error::Core(err));
        }
    };

    let incident = match outcome {
        NormalizeOutcome::NotAnIncident => {
            state.metrics.inc_webhooks_skipped();
            return Ok(WebhookResponse {
                status: "skipped".to_string(),
                external_key: None,
                severity: None,
                category: None,
                message: "payload is not an incident".to_string(),
                primary_runbook: None,
                alternative_runbooks: Vec::new(),
            });
        }
        NormalizeOutcome::Incident(incident) => incident,
    };

    audit(state, AuditEvent::new("webhook", "received", AuditStatus::Success, state.config.dry_run)
        .with_external_key(&incident.external_key)
        .with_component(&incident.component))
    .await;
    audit(
        state,
        AuditEvent::new("normalization", "normalize", AuditStatus::Success, state.config.dry_run)
            .with_external_key(&incident.external_key),
    )
    .await;

    let correlation = correlate_incident(state, &incident).await?;

    info!(external_key = %incident.external_key, correlated = correlation.correlated, "correlation complete");

    let verdict = match state.llm.triage(&incident).await {
        Ok(verdict) => {
            state.metrics.inc_llm_calls();
            verdict
        }
        Err(err) => {
            state.metrics.inc_llm_errors();
            audit(
                state,
                AuditEvent::new("llm_triage", "triage", AuditStatus::Failure, state.config.dry_run)
                    .with_external_key(&incident.external_key)
                    .with_detail("error", serde_json::json!(err.to_string())),
            )
            .await;
            return Err(Error::Triage(err));
        }
    };

    let policy_verdict = evaluate(&incident, &verdict);
    audit_policy(state, &incident, &policy_verdict).await;

    let (primary_runbook, alternative_runbooks) =
        state.runbooks.best_matches(verdict.category, &incident.title, &incident.description);

    notify_ticketing(state, &incident, &policy_verdict).await;
    notify_chat(state, &incident, &policy_verdict).await;

    state.metrics.inc_webhooks_processed();

    Ok(WebhookResponse {
        status: "processed".to_string(),
        external_key: Some(incident.external_key.clone()),
        severity: Some(policy_verdict.final_severity.to_string()),
        category: Some(verdict.category.as_str().to_string()),
        message: format!(
            "committed severity {} for category {}",
            policy_verdict.final_severity,
            verdict.category.as_str()
        ),
        primary_runbook,
        alternative_runbooks,
    })
}

async fn correlate_incident(
    state: &AppState,
    incident: &Incident,
) -> Result<autopilot_core::correlator::CorrelationResult> {
    let candidates = state
        .store
        .find_correlated(&incident.component, state.config.correlation_window, &incident.external_key)
        .await?;

    let result = correlate(incident, &candidates);

    audit(
        state,
        AuditEvent::new(
            "correlation",
            "lookup",
            if result.correlated { AuditStatus::Success } else { AuditStatus::NoMatch },
            state.config.dry_run,
        )
        .with_external_key(&incident.external_key)
        .with_detail("correlated_with", serde_json::json!(result.correlated_with)),
    )
    .await;

    state
        .store
        .upsert_incident(&CorrelationRecord {
            external_key: incident.external_key.clone(),
            summary: incident.title.clone(),
            component: incident.component.clone(),
            environment: incident.environment,
            created_at: incident.created_at,
        })
        .await?;

    Ok(result)
}

async fn audit_policy(state: &AppState, incident: &Incident, verdict: &PolicyVerdict) {
    if verdict.overridden {
        audit(
            state,
            AuditEvent::new("policy", "override", AuditStatus::Applied, state.config.dry_run)
                .with_external_key(&incident.external_key)
                .with_severity(verdict.final_severity)
                .with_detail("reason", serde_json::json!(verdict.override_reason)),
        )
        .await;
    }
    if verdict.needs_human_review {
        audit(
            state,
            AuditEvent::new("policy", "human_review", AuditStatus::Flagged, state.config.dry_run)
                .with_external_key(&incident.external_key)
                .with_detail("confidence", serde_json::json!(verdict.confidence)),
        )
        .await;
    }
}

async fn notify_ticketing(state: &AppState, incident: &Incident, verdict: &PolicyVerdict) {
    if state.config.dry_run {
        audit(
            state,
            AuditEvent::new("jira", "would_update", AuditStatus::Skipped, true)
                .with_external_key(&incident.external_key),
        )
        .await;
        return;
    }

    let Some(jira) = state.jira.as_ref() else {
        return;
    };

    match jira.update_issue(incident, verdict).await {
        Ok(()) => {
            audit(
                state,
                AuditEvent::new("jira", "update", AuditStatus::Success, false)
                    .with_external_key(&incident.external_key),
            )
            .await;
        }
        Err(err) => {
            state.metrics.inc_ticketing_failures();
            error!(error = %err, external_key = %incident.external_key, "ticketing update failed");
            audit(
                state,
                AuditEvent::new("jira", "update", AuditStatus::Failure, false)
                    .with_external_key(&incident.external_key)
                    .with_detail("error", serde_json::json!(err)),
            )
            .await;
        }
    }
}

async fn notify_chat(state: &AppState, incident: &Incident, verdict: &PolicyVerdict) {
    if state.config.dry_run {
        audit(
            state,
            AuditEvent::new("slack", "would_notify", AuditStatus::Skipped, true)
                .with_external_key(&incident.external_key),
        )
        .await;
        return;
    }

    let Some(slack) = state.slack.as_ref() else {
        return;
    };

    match slack.notify(incident, verdict).await {
        Ok(()) => {
            audit(
                state,
                AuditEvent::new("slack", "notify", AuditStatus::Success, false)
                    .with_external_key(&incident.external_key),
            )
            .await;
        }
        Err(err) => {
            state.metrics.inc_chat_failures();
            error!(error = %err, external_key = %incident.external_key, "chat notify failed");
            audit(
                state,
                AuditEvent::new("slack", "notify", AuditStatus::Failure, false)
                    .with_external_key(&incident.external_key)
                    .with_detail("error", serde_json::json!(err)),
            )
            .await;
        }
    }
}

async fn audit(state: &AppState, event: AuditEvent) {
    state.audit.record(&event).await;
}
