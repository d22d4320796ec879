//! Prompt construction shared by the OpenAI-style and Anthropic-style
//! backends. Both providers are sent the same system prompt and the same
//! user content; only the request envelope differs.

use autopilot_core::types::Incident;

/// System prompt enforcing JSON-only output with the verdict schema.
pub const SYSTEM_PROMPT: &str = "You are an incident triage assistant. Given an incident report, \
respond with a single JSON object and nothing else: no prose, no markdown fences. \
The object must have exactly these keys: \"category\" (one of deployment, database, \
network, application, security, infrastructure), \"severity\" (one of P1, P2, P3, P4), \
\"confidence\" (a number between 0 and 1), \"owner_team\" (string), \"summary\" (one-sentence \
string), \"first_actions\" (array of up to 7 short strings), \"runbook_suggestion\" (string).";

/// Render the user-turn content for a normalized incident.
pub fn user_prompt(incident: &Incident) -> String {
    format!(
        "Title: {}\nComponent: {}\nEnvironment: {:?}\nLabels: {}\nDescription:\n{}",
        incident.title,
        incident.component,
        incident.environment,
        incident.labels.join(", "),
        incident.description,
    )
}
