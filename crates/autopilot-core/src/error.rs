//! Error type for autopilot-core.
//!
//! The policy engine, correlator, risk scorer and runbook matcher are all
//! total functions over valid inputs (per the policy engine's error-handling
//! contract) — normalization is the only operation in this crate that can
//! fail, on a structurally malformed payload.

/// Result type alias for autopilot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the triage pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The webhook payload could not be normalized into an incident.
    #[error("normalization error: {message}")]
    Normalization { message: String },
}

impl Error {
    /// Build a normalization error.
    pub fn normalization<S: Into<String>>(message: S) -> Self {
        Self::Normalization { message: message.into() }
    }
}
