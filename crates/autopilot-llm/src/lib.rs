//! # autopilot-llm
//!
//! Provider-polymorphic LLM triage adapter: OpenAI-style and Anthropic-style
//! HTTP backends plus a deterministic mock, behind a single [`TriageProvider`]
//! capability, with a defensive JSON verdict parser shared by all backends.

pub mod error;
pub mod mock;
pub mod parser;
pub mod prompt;
pub mod provider;

pub use error::{Error, Result};
pub use provider::{AnthropicClient, LlmBackend, MockClient, OpenAiClient, TriageProvider};
