use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete churn risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Highest risk first, the order dashboards list them in.
    pub const fn ordered() -> [Self; 3] {
        [Self::High, Self::Medium, Self::Low]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("threshold {0} is outside [0, 1]")]
    OutOfRange(f64),
    #[error("medium floor {medium_floor} must be below high floor {high_floor}")]
    Inverted { medium_floor: f64, high_floor: f64 },
}

/// Probability cut points; `0 <= medium_floor < high_floor <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    medium_floor: f64,
    high_floor: f64,
}

impl Thresholds {
    pub fn new(medium_floor: f64, high_floor: f64) -> Result<Self, ThresholdError> {
        for value in [medium_floor, high_floor] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ThresholdError::OutOfRange(value));
            }
        }
        if medium_floor >= high_floor {
            return Err(ThresholdError::Inverted {
                medium_floor,
                high_floor,
            });
        }
        Ok(Self {
            medium_floor,
            high_floor,
        })
    }

    pub fn medium_floor(&self) -> f64 {
        self.medium_floor
    }

    pub fn high_floor(&self) -> f64 {
        self.high_floor
    }

    /// Boundary values belong to the higher tier.
    pub fn classify(&self, probability: f64) -> RiskTier {
        if probability >= self.high_floor {
            RiskTier::High
        } else if probability >= self.medium_floor {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            medium_floor: 0.4,
            high_floor: 0.7,
        }
    }
}

pub fn classify(probability: f64, thresholds: &Thresholds) -> RiskTier {
    thresholds.classify(probability)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_belong_to_the_higher_tier() {
        let thresholds = Thresholds::new(0.4, 0.6).expect("valid");

        assert_eq!(classify(0.6, &thresholds), RiskTier::High);
        assert_eq!(classify(0.5999999, &thresholds), RiskTier::Medium);
        assert_eq!(classify(0.4, &thresholds), RiskTier::Medium);
        assert_eq!(classify(0.3999999, &thresholds), RiskTier::Low);
    }

    #[test]
    fn default_matches_batch_scoring_cut_points() {
        let thresholds = Thresholds::default();

        assert_eq!(thresholds.classify(0.69), RiskTier::Medium);
        assert_eq!(thresholds.classify(0.7), RiskTier::High);
        assert_eq!(thresholds.classify(0.0), RiskTier::Low);
        assert_eq!(thresholds.classify(1.0), RiskTier::High);
    }

    #[test]
    fn rejects_inverted_or_out_of_range_floors() {
        assert!(matches!(
            Thresholds::new(0.7, 0.4),
            Err(ThresholdError::Inverted { .. })
        ));
        assert!(matches!(
            Thresholds::new(0.5, 0.5),
            Err(ThresholdError::Inverted { .. })
        ));
        assert!(matches!(
            Thresholds::new(-0.1, 0.5),
            Err(ThresholdError::OutOfRange(_))
        ));
        assert!(matches!(
            Thresholds::new(0.4, f64::NAN),
            Err(ThresholdError::OutOfRange(_))
        ));
    }

    #[test]
    fn tiers_serialize_uppercase() {
        let json = serde_json::to_string(&RiskTier::Medium).expect("serializes");

        assert_eq!(json, "\"MEDIUM\"");
    }
}
