//! Windowed same-component similarity matching.
//!
//! The correlator itself is a pure function over a candidate set; fetching
//! candidates from the store (same component, within the configured window,
//! excluding the incident's own key) is the caller's responsibility so this
//! module stays deterministic and easy to unit test.

use crate::policy::SIMILARITY_THRESHOLD;
use crate::types::{CorrelationRecord, Incident};

/// Result of a correlation lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationResult {
    /// Whether a matching prior incident was found.
    pub correlated: bool,
    /// External key of the matched prior incident, if any.
    pub correlated_with: Option<String>,
    /// Similarity score of the match, if any.
    pub similarity: Option<f64>,
}

impl CorrelationResult {
    fn none() -> Self {
        Self { correlated: false, correlated_with: None, similarity: None }
    }
}

/// Ratio of longest-common-subsequence-style matched characters to the
/// combined length of both strings: `2*M / (|a| + |b|)`, equivalent to
/// Python's `difflib.SequenceMatcher.ratio()`. Deterministic for identical
/// inputs; 1.0 for identical strings, near 0 for disjoint strings.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Classic LCS length via dynamic programming.
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ai in &a {
        for (bj, bc) in b.iter().enumerate() {
            curr[bj + 1] = if ai == bc {
                prev[bj] + 1
            } else {
                prev[bj + 1].max(curr[bj])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
        curr.iter_mut().for_each(|v| *v = 0);
    }
    let matched = prev[b.len()] as f64;

    (2.0 * matched) / (a.len() + b.len()) as f64
}

/// Find the first candidate whose normalized title similarity to the
/// incident's title meets the fixed threshold. Candidates are assumed to
/// already be restricted to the same component, the configured window, and
/// to exclude the incident's own key.
pub fn correlate(incident: &Incident, candidates: &[CorrelationRecord]) -> CorrelationResult {
    if incident.component == "unknown" {
        return CorrelationResult::none();
    }

    let needle = incident.title.trim().to_lowercase();
    for candidate in candidates {
        if candidate.external_key == incident.external_key {
            continue;
        }
        let haystack = candidate.summary.trim().to_lowercase();
        let sim = similarity_ratio(&needle, &haystack);
        if sim >= SIMILARITY_THRESHOLD {
            return CorrelationResult {
                correlated: true,
                correlated_with: Some(candidate.external_key.clone()),
                similarity: Some(sim),
            };
        }
    }
    CorrelationResult::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Environment;
    use chrono::Utc;
    use serde_json::json;

    fn incident(external_key: &str, title: &str, component: &str) -> Incident {
        Incident {
            external_key: external_key.into(),
            title: title.into(),
            description: String::new(),
            labels: vec![],
            component: component.into(),
            environment: Environment::Prod,
            reporter: "unknown".into(),
            created_at: Utc::now(),
            raw_payload: json!({}),
        }
    }

    fn record(external_key: &str, summary: &str, component: &str) -> CorrelationRecord {
        CorrelationRecord {
            external_key: external_key.into(),
            summary: summary.into(),
            component: component.into(),
            environment: Environment::Prod,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn identical_strings_are_ratio_one() {
        assert!((similarity_ratio("hello world", "hello world") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_strings_are_near_zero() {
        assert!(similarity_ratio("abcdef", "ghijkl") < 0.2);
    }

    #[test]
    fn unknown_component_never_correlates() {
        let inc = incident("OPS-2", "Payments API 500s", "unknown");
        let candidates = vec![record("OPS-1", "Payments API 500s", "unknown")];
        let result = correlate(&inc, &candidates);
        assert!(!result.correlated);
    }

    #[test]
    fn similar_titles_correlate_above_threshold() {
        let inc = incident("OPS-2", "Payments API returning 500s", "payments");
        let candidates = vec![record("OPS-1", "Payments API 500 errors", "payments")];
        let result = correlate(&inc, &candidates);
        assert!(result.correlated);
        assert_eq!(result.correlated_with.as_deref(), Some("OPS-1"));
        assert!(result.similarity.unwrap() >= SIMILARITY_THRESHOLD);
    }

    #[test]
    fn never_self_matches() {
        let inc = incident("OPS-1", "Payments API 500s", "payments");
        let candidates = vec![record("OPS-1", "Payments API 500s", "payments")];
        let result = correlate(&inc, &candidates);
        assert!(!result.correlated);
    }

    #[test]
    fn dissimilar_titles_do_not_correlate() {
        let inc = incident("OPS-2", "Payments API 500s", "payments");
        let candidates = vec![record("OPS-1", "Completely unrelated incident about DNS", "payments")];
        let result = correlate(&inc, &candidates);
        assert!(!result.correlated);
    }
}
