//! Side-effect clients: ticketing and chat, both dry-run gated by the
//! pipeline driver rather than by the clients themselves.

pub mod jira;
pub mod slack;

pub use jira::JiraClient;
pub use slack::SlackClient;
