//! Runbook catalog and category/keyword-overlap matching.

use crate::types::IncidentCategory;
use serde::{Deserialize, Serialize};

/// A single runbook catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunbookEntry {
    /// Category key this entry is filed under.
    pub category: IncidentCategory,
    /// Human display name.
    pub name: String,
    /// Documentation URL.
    pub url: String,
    /// Ordered remediation steps.
    pub steps: Vec<String>,
    /// Keywords used for the keyword-overlap component of the score.
    pub keywords: Vec<String>,
}

/// A scored runbook match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunbookMatch {
    /// The matched entry.
    pub entry: RunbookEntry,
    /// Combined score in [0,1].
    pub score: f64,
}

/// The static runbook catalog, loaded once at startup and held read-only.
#[derive(Debug, Clone)]
pub struct RunbookCatalog {
    entries: Vec<RunbookEntry>,
}

impl RunbookCatalog {
    /// Build a catalog from a pre-loaded list of entries.
    pub fn new(entries: Vec<RunbookEntry>) -> Self {
        Self { entries }
    }

    /// Parse a catalog from its embedded JSON representation.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<RunbookEntry> = serde_json::from_str(raw)?;
        Ok(Self::new(entries))
    }

    /// The default built-in catalog, used when no override is configured.
    pub fn default_catalog() -> Self {
        Self::from_json(include_str!("../assets/runbooks.json"))
            .expect("bundled runbook catalog is valid JSON")
    }

    /// All catalog entries, for the `/api/runbooks` listing.
    pub fn entries(&self) -> &[RunbookEntry] {
        &self.entries
    }

    /// Score and rank every entry against the given category and text,
    /// returning the primary match and up to three alternates whose score
    /// exceeds 0.1.
    pub fn best_matches(
        &self,
        category: IncidentCategory,
        title: &str,
        description: &str,
    ) -> (Option<RunbookMatch>, Vec<RunbookMatch>) {
        let text = format!("{title} {description}").to_lowercase();

        let mut scored: Vec<RunbookMatch> = self
            .entries
            .iter()
            .map(|entry| RunbookMatch { entry: entry.clone(), score: score_entry(entry, category, &text) })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        if scored.is_empty() {
            return (None, Vec::new());
        }

        let primary = scored.remove(0);
        let alternates = scored.into_iter().filter(|m| m.score > 0.1).take(3).collect();
        (Some(primary), alternates)
    }
}

fn score_entry(entry: &RunbookEntry, category: IncidentCategory, text: &str) -> f64 {
    let type_score = if entry.category == category { 1.0 } else { 0.0 };

    let keyword_score = if entry.keywords.is_empty() {
        0.0
    } else {
        let matches = entry.keywords.iter().filter(|kw| text.contains(kw.as_str())).count();
        let base = matches as f64 / entry.keywords.len() as f64;
        let boost = (1.0 + 0.1 * matches as f64).min(2.0);
        (base * boost).min(1.0)
    };

    0.6 * type_score + 0.4 * keyword_score
}
