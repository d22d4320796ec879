//! Durable indexed persistence backed by an embedded SQLite database.
//!
//! Every public method runs its own transaction: begin on entry, commit on
//! normal return, rollback (implicit, via `Transaction` drop) on error.

use crate::error::{Error, Result};
use autopilot_core::types::{
    AuditEvent, AuditStatus, CorrelationRecord, Environment, Severity, WebIncident,
    WebIncidentStatus,
};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::time::Duration;

/// Handle to the embedded relational store.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

fn enum_to_text<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

fn text_to_enum<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_value(serde_json::Value::String(text.to_string()))?)
}

impl Store {
    /// Connect to (creating if necessary) the SQLite database at `path` and
    /// run pending migrations.
    pub async fn connect(path: &str) -> Result<Self> {
        let url = format!("sqlite://{path}?mode=rwc");
        let pool = SqlitePoolOptions::new().max_connections(5).connect(&url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Construct a store around an already-open pool (used by tests with an
    /// in-memory database).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Insert an audit event, durable before returning. Returns the row id.
    pub async fn insert_audit_event(&self, event: &AuditEvent) -> Result<i64> {
        let details = serde_json::to_string(&event.details)?;
        let status = enum_to_text(&event.status)?;
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "INSERT INTO audit_events
                (timestamp, event_type, action, status, external_key, component, severity, details, dry_run)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(event.timestamp.to_rfc3339())
        .bind(&event.event_type)
        .bind(&event.action)
        .bind(status)
        .bind(&event.external_key)
        .bind(&event.component)
        .bind(&event.severity)
        .bind(details)
        .bind(event.dry_run)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row.try_get("id")?)
    }

    /// Insert-or-replace a correlation record on its external key.
    pub async fn upsert_incident(&self, record: &CorrelationRecord) -> Result<()> {
        let environment = enum_to_text(&record.environment)?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO incidents (external_key, summary, component, environment, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(external_key) DO UPDATE SET
                summary = excluded.summary,
                component = excluded.component,
                environment = excluded.environment,
                created_at = excluded.created_at",
        )
        .bind(&record.external_key)
        .bind(&record.summary)
        .bind(&record.component)
        .bind(environment)
        .bind(record.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Fetch correlation records for `component` created within `window` of
    /// now, excluding `exclude_key`. Result order is unspecified.
    pub async fn find_correlated(
        &self,
        component: &str,
        window: Duration,
        exclude_key: &str,
    ) -> Result<Vec<CorrelationRecord>> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::zero());
        let rows = sqlx::query(
            "SELECT external_key, summary, component, environment, created_at
             FROM incidents
             WHERE component = ? AND created_at >= ? AND external_key != ?",
        )
        .bind(component)
        .bind(cutoff.to_rfc3339())
        .bind(exclude_key)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_correlation).collect()
    }

    /// Most recent audit events, newest first.
    pub async fn get_recent_audit_events(&self, limit: i64) -> Result<Vec<AuditEvent>> {
        let rows = sqlx::query(
            "SELECT timestamp, event_type, action, status, external_key, component, severity, details, dry_run
             FROM audit_events
             ORDER BY timestamp DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_audit_event).collect()
    }

    /// Audit events for a single incident's external key, newest first.
    pub async fn get_audit_events_for(&self, external_key: &str) -> Result<Vec<AuditEvent>> {
        let rows = sqlx::query(
            "SELECT timestamp, event_type, action, status, external_key, component, severity, details, dry_run
             FROM audit_events
             WHERE external_key = ?
             ORDER BY timestamp DESC",
        )
        .bind(external_key)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_audit_event).collect()
    }

    /// Insert a newly created web incident.
    pub async fn insert_web_incident(&self, incident: &WebIncident) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_or_replace_web_incident(&mut tx, incident).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Persist an updated web incident (status transitions, triage results).
    pub async fn update_web_incident(&self, incident: &WebIncident) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_or_replace_web_incident(&mut tx, incident).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Fetch a single web incident by id.
    pub async fn get_web_incident(&self, id: &str) -> Result<Option<WebIncident>> {
        let row = sqlx::query(
            "SELECT id, incident, status, policy_verdict, llm_verdict, original_severity,
                    decision_author, decision_at, decision_note
             FROM web_incidents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_web_incident).transpose()
    }

    /// List web incidents, optionally filtered by status, newest first.
    pub async fn list_web_incidents(
        &self,
        status: Option<WebIncidentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WebIncident>> {
        let rows = if let Some(status) = status {
            let status_text = enum_to_text(&status)?;
            sqlx::query(
                "SELECT id, incident, status, policy_verdict, llm_verdict, original_severity,
                        decision_author, decision_at, decision_note
                 FROM web_incidents
                 WHERE status = ?
                 ORDER BY created_at DESC
                 LIMIT ? OFFSET ?",
            )
            .bind(status_text)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, incident, status, policy_verdict, llm_verdict, original_severity,
                        decision_author, decision_at, decision_note
                 FROM web_incidents
                 ORDER BY created_at DESC
                 LIMIT ? OFFSET ?",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(row_to_web_incident).collect()
    }
}

async fn insert_or_replace_web_incident(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    incident: &WebIncident,
) -> Result<()> {
    let incident_json = serde_json::to_string(&incident.incident)?;
    let status = enum_to_text(&incident.status)?;
    let policy_json = incident.policy_verdict.as_ref().map(serde_json::to_string).transpose()?;
    let llm_json = incident.llm_verdict.as_ref().map(serde_json::to_string).transpose()?;
    let original_severity =
        incident.original_severity.as_ref().map(enum_to_text).transpose()?;

    sqlx::query(
        "INSERT INTO web_incidents
            (id, incident, status, policy_verdict, llm_verdict, original_severity,
             decision_author, decision_at, decision_note, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            incident = excluded.incident,
            status = excluded.status,
            policy_verdict = excluded.policy_verdict,
            llm_verdict = excluded.llm_verdict,
            original_severity = excluded.original_severity,
            decision_author = excluded.decision_author,
            decision_at = excluded.decision_at,
            decision_note = excluded.decision_note",
    )
    .bind(&incident.id)
    .bind(incident_json)
    .bind(status)
    .bind(policy_json)
    .bind(llm_json)
    .bind(original_severity)
    .bind(&incident.decision_author)
    .bind(incident.decision_at.map(|dt| dt.to_rfc3339()))
    .bind(&incident.decision_note)
    .bind(incident.incident.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn row_to_correlation(row: sqlx::sqlite::SqliteRow) -> Result<CorrelationRecord> {
    let environment: String = row.try_get("environment")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(CorrelationRecord {
        external_key: row.try_get("external_key")?,
        summary: row.try_get("summary")?,
        component: row.try_get("component")?,
        environment: text_to_enum::<Environment>(&environment)?,
        created_at: parse_rfc3339(&created_at)?,
    })
}

fn row_to_audit_event(row: sqlx::sqlite::SqliteRow) -> Result<AuditEvent> {
    let timestamp: String = row.try_get("timestamp")?;
    let status: String = row.try_get("status")?;
    let details: String = row.try_get("details")?;
    Ok(AuditEvent {
        timestamp: parse_rfc3339(&timestamp)?,
        event_type: row.try_get("event_type")?,
        action: row.try_get("action")?,
        status: text_to_enum::<AuditStatus>(&status)?,
        external_key: row.try_get("external_key")?,
        component: row.try_get("component")?,
        severity: row.try_get("severity")?,
        details: serde_json::from_str(&details)?,
        dry_run: row.try_get("dry_run")?,
    })
}

fn row_to_web_incident(row: sqlx::sqlite::SqliteRow) -> Result<WebIncident> {
    let incident_json: String = row.try_get("incident")?;
    let status: String = row.try_get("status")?;
    let policy_json: Option<String> = row.try_get("policy_verdict")?;
    let llm_json: Option<String> = row.try_get("llm_verdict")?;
    let original_severity: Option<String> = row.try_get("original_severity")?;
    let decision_at: Option<String> = row.try_get("decision_at")?;

    Ok(WebIncident {
        id: row.try_get("id")?,
        incident: serde_json::from_str(&incident_json)?,
        status: text_to_enum::<WebIncidentStatus>(&status)?,
        policy_verdict: policy_json.map(|j| serde_json::from_str(&j)).transpose()?,
        llm_verdict: llm_json.map(|j| serde_json::from_str(&j)).transpose()?,
        original_severity: original_severity
            .map(|s| text_to_enum::<Severity>(&s))
            .transpose()?,
        decision_author: row.try_get("decision_author")?,
        decision_at: decision_at.map(|s| parse_rfc3339(&s)).transpose()?,
        decision_note: row.try_get("decision_note")?,
    })
}

fn parse_rfc3339(raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|_| Error::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_core::types::{Environment, Incident, WebIncidentStatus};
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashMap;

    async fn test_store() -> Store {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        Store::from_pool(pool).await.unwrap()
    }

    fn correlation(external_key: &str, component: &str) -> CorrelationRecord {
        CorrelationRecord {
            external_key: external_key.into(),
            summary: "Payments API 500s".into(),
            component: component.into(),
            environment: Environment::Prod,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_and_find_correlated_excludes_self() {
        let store = test_store().await;
        store.upsert_incident(&correlation("OPS-1", "payments")).await.unwrap();
        store.upsert_incident(&correlation("OPS-2", "payments")).await.unwrap();

        let found = store
            .find_correlated("payments", Duration::from_secs(1800), "OPS-2")
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].external_key, "OPS-1");
    }

    #[tokio::test]
    async fn audit_events_round_trip() {
        let store = test_store().await;
        let event = AuditEvent::new("webhook", "received", AuditStatus::Success, true)
            .with_external_key("OPS-1")
            .with_detail("note", json!("hello"));
        let id = store.insert_audit_event(&event).await.unwrap();
        assert!(id > 0);

        let recent = store.get_recent_audit_events(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].external_key.as_deref(), Some("OPS-1"));
        assert!(recent[0].dry_run);
    }

    #[tokio::test]
    async fn web_incident_upsert_round_trip() {
        let store = test_store().await;
        let incident = WebIncident {
            id: "wi-1".into(),
            incident: Incident {
                external_key: "wi-1".into(),
                title: "t".into(),
                description: "d".into(),
                labels: vec![],
                component: "unknown".into(),
                environment: Environment::Dev,
                reporter: "unknown".into(),
                created_at: chrono::Utc::now(),
                raw_payload: json!({}),
            },
            status: WebIncidentStatus::Pending,
            policy_verdict: None,
            llm_verdict: None,
            original_severity: None,
            decision_author: None,
            decision_at: None,
            decision_note: None,
        };
        store.insert_web_incident(&incident).await.unwrap();

        let fetched = store.get_web_incident("wi-1").await.unwrap().unwrap();
        assert_eq!(fetched.status, WebIncidentStatus::Pending);

        let listed = store.list_web_incidents(Some(WebIncidentStatus::Pending), 10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
        let _ = HashMap::<String, serde_json::Value>::new();
    }
}
