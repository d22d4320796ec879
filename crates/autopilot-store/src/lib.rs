//! # autopilot-store
//!
//! Durable persistence for the incident triage autopilot: an embedded
//! SQLite store for audit events, correlation records and web-submitted
//! incidents, plus a dual-write audit sink that backstops the database with
//! an append-only JSON-lines log.

pub mod audit;
pub mod error;
pub mod store;

pub use audit::AuditSink;
pub use error::{Error, Result};
pub use store::Store;
