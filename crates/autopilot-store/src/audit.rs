//! Dual-write audit sink: every event is written to the indexed store and
//! appended to a line-delimited JSON log file. The two writes are
//! independent — a failure on one side is logged and does not roll back
//! the other, since the append-only log is the durability backstop for
//! audit trail integrity if the database is ever lost or corrupted.

use crate::store::Store;
use autopilot_core::types::AuditEvent;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Writes audit events to both the relational store and an append-only
/// `.jsonl` log file.
pub struct AuditSink {
    store: Store,
    log_path: PathBuf,
    log_lock: Mutex<()>,
}

impl AuditSink {
    /// Build a sink backed by `store`, appending to `log_path`.
    pub fn new(store: Store, log_path: impl Into<PathBuf>) -> Self {
        Self { store, log_path: log_path.into(), log_lock: Mutex::new(()) }
    }

    /// Record `event`, writing to the store and the audit log. Each
    /// destination's failure is reported independently; the caller only
    /// learns about the fact that something in the pipeline kept moving,
    /// which is the whole point of an audit sink that must not block
    /// ingestion on a logging hiccup.
    pub async fn record(&self, event: &AuditEvent) {
        if let Err(err) = self.store.insert_audit_event(event).await {
            tracing::error!(error = %err, event_type = %event.event_type, "audit store write failed");
        }
        if let Err(err) = self.append_log(event).await {
            tracing::error!(error = %err, event_type = %event.event_type, "audit log append failed");
        }
    }

    async fn append_log(&self, event: &AuditEvent) -> crate::error::Result<()> {
        let line = serde_json::to_string(event)?;
        let _guard = self.log_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .map_err(|err| crate::error::Error::Database(sqlx::Error::Io(err)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|err| crate::error::Error::Database(sqlx::Error::Io(err)))?;
        file.write_all(b"\n")
            .await
            .map_err(|err| crate::error::Error::Database(sqlx::Error::Io(err)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_core::types::AuditStatus;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::tempdir;

    async fn test_store() -> Store {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        Store::from_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn record_writes_store_and_log() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");
        let sink = AuditSink::new(test_store().await, &log_path);

        let event = AuditEvent::new("webhook", "received", AuditStatus::Success, false)
            .with_external_key("OPS-1");
        sink.record(&event).await;

        let recent = sink.store.get_recent_audit_events(10).await.unwrap();
        assert_eq!(recent.len(), 1);

        let contents = tokio::fs::read_to_string(&log_path).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("OPS-1"));
    }

    #[tokio::test]
    async fn record_appends_multiple_lines() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");
        let sink = AuditSink::new(test_store().await, &log_path);

        for i in 0..3 {
            let event = AuditEvent::new("webhook", "received", AuditStatus::Success, false)
                .with_external_key(format!("OPS-{i}"));
            sink.record(&event).await;
        }

        let contents = tokio::fs::read_to_string(&log_path).await.unwrap();
        assert_eq!(contents.lines().count(), 3);
    }
}
