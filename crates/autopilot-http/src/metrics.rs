//! Process-local counters reported on `/metrics`, updated with
//! `std::sync::atomic` increments so readers always see a monotonic view
//! without taking a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic pipeline counters.
#[derive(Default)]
pub struct Metrics {
    webhooks_received: AtomicU64,
    webhooks_processed: AtomicU64,
    webhooks_rejected: AtomicU64,
    webhooks_skipped: AtomicU64,
    llm_calls: AtomicU64,
    llm_errors: AtomicU64,
    ticketing_failures: AtomicU64,
    chat_failures: AtomicU64,
}

impl Metrics {
    /// A fresh, all-zero counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the webhooks-received counter.
    pub fn inc_webhooks_received(&self) {
        self.webhooks_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the webhooks-processed counter.
    pub fn inc_webhooks_processed(&self) {
        self.webhooks_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the webhooks-rejected counter.
    pub fn inc_webhooks_rejected(&self) {
        self.webhooks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the webhooks-skipped counter.
    pub fn inc_webhooks_skipped(&self) {
        self.webhooks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the LLM-calls counter.
    pub fn inc_llm_calls(&self) {
        self.llm_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the LLM-errors counter.
    pub fn inc_llm_errors(&self) {
        self.llm_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the ticketing-failures counter.
    pub fn inc_ticketing_failures(&self) {
        self.ticketing_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the chat-failures counter.
    pub fn inc_chat_failures(&self) {
        self.chat_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters as a JSON value for the `/metrics` endpoint.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "webhooks_received": self.webhooks_received.load(Ordering::Relaxed),
            "webhooks_processed": self.webhooks_processed.load(Ordering::Relaxed),
            "webhooks_rejected": self.webhooks_rejected.load(Ordering::Relaxed),
            "webhooks_skipped": self.webhooks_skipped.load(Ordering::Relaxed),
            "llm_calls": self.llm_calls.load(Ordering::Relaxed),
            "llm_errors": self.llm_errors.load(Ordering::Relaxed),
            "ticketing_failures": self.ticketing_failures.load(Ordering::Relaxed),
            "chat_failures": self.chat_failures.load(Ordering::Relaxed),
        })
    }
}
