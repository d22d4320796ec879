//! Risk scoring: a pure weighted combination of severity, confidence and
//! environment into a single [0,1] score, plus a display banding.

use crate::types::{Environment, Severity};

/// Qualitative band for displaying a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        write!(f, "{s}")
    }
}

/// Compute the [0,1] risk score for a committed severity, LLM confidence and
/// environment.
pub fn score(severity: Severity, confidence: f64, environment: Environment) -> f64 {
    let confidence = confidence.clamp(0.0, 1.0);
    let raw = 0.4 * severity.weight() + 0.3 * (1.0 - confidence) + 0.3 * environment.weight();
    raw.clamp(0.0, 1.0)
}

/// Qualitative band for a risk score.
pub fn band(score: f64) -> RiskBand {
    if score >= 0.8 {
        RiskBand::Critical
    } else if score >= 0.6 {
        RiskBand::High
    } else if score >= 0.4 {
        RiskBand::Medium
    } else {
        RiskBand::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_case_is_one() {
        let s = score(Severity::P1, 0.0, Environment::Prod);
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn best_case_is_low() {
        let s = score(Severity::P4, 1.0, Environment::Dev);
        assert_eq!(band(s), RiskBand::Low);
    }

    #[test]
    fn property_score_is_always_bounded() {
        for sev in [Severity::P1, Severity::P2, Severity::P3, Severity::P4] {
            for env in [Environment::Prod, Environment::Staging, Environment::Dev, Environment::Unknown]
            {
                for tenth in 0..=10 {
                    let confidence = tenth as f64 / 10.0;
                    let s = score(sev, confidence, env);
                    assert!((0.0..=1.0).contains(&s));
                }
            }
        }
    }
}
