//! Match tiers
//!
//! Tier bands are configuration defaults, not physical constants: real
//! forensic reporting thresholds depend on jurisdiction and assay. Every lower
//! edge is closed, so a score of exactly 0.95 is a definite match.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_DEFINITE: f64 = 0.95;
pub const DEFAULT_PROBABLE: f64 = 0.80;
pub const DEFAULT_PARTIAL: f64 = 0.50;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error(
        "Invalid tier thresholds {definite}/{probable}/{partial}: must lie in 0.0..=1.0 and strictly descend"
    )]
    InvalidThresholds {
        definite: f64,
        probable: f64,
        partial: f64,
    },

    #[error("Invalid minimum score {0}: must be between 0.0 and 1.0")]
    InvalidMinScore(f64),
}

/// Discrete match classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    NoMatch,
    PartialMatch,
    ProbableMatch,
    DefiniteMatch,
}

impl Tier {
    /// Report label, e.g. `"DEFINITE MATCH"`.
    pub fn label(&self) -> &'static str {
        match self {
            Tier::DefiniteMatch => "DEFINITE MATCH",
            Tier::ProbableMatch => "PROBABLE MATCH",
            Tier::PartialMatch => "PARTIAL MATCH",
            Tier::NoMatch => "NO MATCH",
        }
    }

    pub fn confidence(&self) -> &'static str {
        match self {
            Tier::DefiniteMatch => "VERY HIGH",
            Tier::ProbableMatch => "HIGH",
            Tier::PartialMatch => "MEDIUM",
            Tier::NoMatch => "LOW",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lower edges of the three match tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct TierThresholds {
    definite: f64,
    probable: f64,
    partial: f64,
}

#[derive(Deserialize)]
struct RawThresholds {
    #[serde(default = "default_definite")]
    definite: f64,
    #[serde(default = "default_probable")]
    probable: f64,
    #[serde(default = "default_partial")]
    partial: f64,
}

fn default_definite() -> f64 {
    DEFAULT_DEFINITE
}

fn default_probable() -> f64 {
    DEFAULT_PROBABLE
}

fn default_partial() -> f64 {
    DEFAULT_PARTIAL
}

impl TryFrom<RawThresholds> for TierThresholds {
    type Error = ThresholdError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        TierThresholds::new(raw.definite, raw.probable, raw.partial)
    }
}

impl TierThresholds {
    pub fn new(definite: f64, probable: f64, partial: f64) -> Result<Self, ThresholdError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_unit(definite) && in_unit(probable) && in_unit(partial))
            || !(definite > probable && probable > partial)
        {
            return Err(ThresholdError::InvalidThresholds {
                definite,
                probable,
                partial,
            });
        }

        Ok(Self {
            definite,
            probable,
            partial,
        })
    }

    pub fn definite(&self) -> f64 {
        self.definite
    }

    pub fn probable(&self) -> f64 {
        self.probable
    }

    pub fn partial(&self) -> f64 {
        self.partial
    }

    pub fn classify(&self, score: f64) -> Tier {
        if score >= self.definite {
            Tier::DefiniteMatch
        } else if score >= self.probable {
            Tier::ProbableMatch
        } else if score >= self.partial {
            Tier::PartialMatch
        } else {
            Tier::NoMatch
        }
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            definite: DEFAULT_DEFINITE,
            probable: DEFAULT_PROBABLE,
            partial: DEFAULT_PARTIAL,
        }
    }
}

/// Classify with the default thresholds.
pub fn classify(score: f64) -> Tier {
    TierThresholds::default().classify(score)
}

/// Check a caller-supplied minimum score.
pub fn validate_min_score(min_score: f64) -> Result<f64, ThresholdError> {
    if !(0.0..=1.0).contains(&min_score) {
        return Err(ThresholdError::InvalidMinScore(min_score));
    }
    Ok(min_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_edges_are_closed() {
        assert_eq!(classify(0.95), Tier::DefiniteMatch);
        assert_eq!(classify(0.80), Tier::ProbableMatch);
        assert_eq!(classify(0.50), Tier::PartialMatch);
    }

    #[test]
    fn test_bands() {
        assert_eq!(classify(1.0), Tier::DefiniteMatch);
        assert_eq!(classify(0.9499), Tier::ProbableMatch);
        assert_eq!(classify(0.7999), Tier::PartialMatch);
        assert_eq!(classify(0.4999), Tier::NoMatch);
        assert_eq!(classify(0.0), Tier::NoMatch);
    }

    #[test]
    fn test_scores_from_allele_counts_hit_edges_exactly() {
        // 19 of 20 shared, 16 of 20, 10 of 20
        assert_eq!(classify(38.0 / 40.0), Tier::DefiniteMatch);
        assert_eq!(classify(32.0 / 40.0), Tier::ProbableMatch);
        assert_eq!(classify(20.0 / 40.0), Tier::PartialMatch);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = TierThresholds::new(0.99, 0.9, 0.7).unwrap();

        assert_eq!(thresholds.classify(0.95), Tier::ProbableMatch);
        assert_eq!(thresholds.classify(0.6), Tier::NoMatch);
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(TierThresholds::new(1.5, 0.8, 0.5).is_err());
        assert!(TierThresholds::new(0.95, 0.8, -0.1).is_err());
        assert!(TierThresholds::new(0.8, 0.95, 0.5).is_err());
        assert!(TierThresholds::new(0.8, 0.8, 0.5).is_err());
        assert!(TierThresholds::new(f64::NAN, 0.8, 0.5).is_err());
    }

    #[test]
    fn test_min_score_validation() {
        assert_eq!(validate_min_score(0.5), Ok(0.5));
        assert!(validate_min_score(1.01).is_err());
        assert!(validate_min_score(f64::NAN).is_err());
    }

    #[test]
    fn test_tier_ordering_and_labels() {
        assert!(Tier::DefiniteMatch > Tier::ProbableMatch);
        assert!(Tier::PartialMatch > Tier::NoMatch);
        assert_eq!(Tier::PartialMatch.to_string(), "PARTIAL MATCH");
        assert_eq!(Tier::DefiniteMatch.confidence(), "VERY HIGH");
        assert_eq!(
            serde_json::to_string(&Tier::ProbableMatch).unwrap(),
            "\"PROBABLE_MATCH\""
        );
    }

    #[test]
    fn test_thresholds_deserialize_with_defaults() {
        let thresholds: TierThresholds = toml::from_str("definite = 0.9").unwrap();
        assert_eq!(thresholds.definite(), 0.9);
        assert_eq!(thresholds.probable(), DEFAULT_PROBABLE);

        assert!(toml::from_str::<TierThresholds>("definite = 0.4").is_err());
    }
}
