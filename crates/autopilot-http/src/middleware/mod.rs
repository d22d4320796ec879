//! HTTP middleware: webhook authentication and per-client rate limiting.

pub mod auth;
pub mod rate_limit;

pub use auth::require_webhook_secret;
pub use rate_limit::enforce_rate_limit;
