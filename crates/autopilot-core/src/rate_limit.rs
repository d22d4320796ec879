//! Per-client sliding-window rate limiter, keyed by client IP.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is allowed.
    pub allowed: bool,
    /// Requests remaining in the current window after this check.
    pub remaining: u32,
    /// Seconds until the window resets enough to admit another request.
    pub reset_seconds: u64,
}

/// A per-key sliding-window counter, mirroring the indexed in-memory store
/// pattern used elsewhere in the codebase (an `Arc<RwLock<HashMap<..>>>`).
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<String, VecDeque<chrono::DateTime<chrono::Utc>>>>>,
    capacity: u32,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `capacity` requests per `window`.
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self { windows: Arc::new(RwLock::new(HashMap::new())), capacity, window }
    }

    /// Evaluate and record a request for `key`.
    pub async fn allow(&self, key: &str) -> RateLimitDecision {
        let now = chrono::Utc::now();
        let window_secs = self.window.as_secs() as i64;

        let mut windows = self.windows.write().await;
        let entry = windows.entry(key.to_string()).or_default();

        while let Some(&front) = entry.front() {
            if (now - front).num_seconds() >= window_secs {
                entry.pop_front();
            } else {
                break;
            }
        }

        let allowed = (entry.len() as u32) < self.capacity;
        if allowed {
            entry.push_back(now);
        }

        let remaining = self.capacity.saturating_sub(entry.len() as u32);

        let reset_seconds = match entry.front() {
            Some(oldest) => {
                let elapsed = (now - *oldest).num_seconds().max(0);
                (window_secs - elapsed).max(0) as u64
            }
            None => window_secs as u64,
        };

        RateLimitDecision { allowed, remaining, reset_seconds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_capacity_then_blocks() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.allow("client-a").await.allowed);
        assert!(limiter.allow("client-a").await.allowed);
        let third = limiter.allow("client-a").await;
        assert!(!third.allowed);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.allow("a").await.allowed);
        assert!(limiter.allow("b").await.allowed);
    }

    #[tokio::test]
    async fn reset_seconds_is_full_window_when_empty() {
        let limiter = RateLimiter::new(5, Duration::from_secs(30));
        let decision = limiter.allow("fresh").await;
        assert!(decision.reset_seconds <= 30);
    }
}
