//! Error type for the LLM adapter crate.

/// Result alias for triage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the triage provider.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The outbound HTTP call itself failed (connect, timeout, TLS, ...).
    #[error("llm transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider responded but the body wasn't parseable as a verdict.
    #[error("llm response parse error: {0}")]
    Parse(String),

    /// The provider returned a non-success status code.
    #[error("llm provider returned {status}: {body}")]
    ProviderStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },
}
