use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the triage priority is derived from the expected loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityFormula {
    /// `probability * expected_revenue_loss`: favors customers who are both
    /// likely to leave and expensive to lose.
    #[default]
    ProbabilityWeighted,
    /// `expected_revenue_loss` as-is.
    ExpectedLoss,
}

impl PriorityFormula {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ProbabilityWeighted => "probability_weighted",
            Self::ExpectedLoss => "expected_loss",
        }
    }
}

impl fmt::Display for PriorityFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority formula '{0}'")]
pub struct UnknownPriorityFormula(pub String);

impl FromStr for PriorityFormula {
    type Err = UnknownPriorityFormula;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "probability_weighted" | "prob_x_loss" => Ok(Self::ProbabilityWeighted),
            "expected_loss" | "loss" => Ok(Self::ExpectedLoss),
            other => Err(UnknownPriorityFormula(other.to_string())),
        }
    }
}

/// Monetary exposure figures for one scored customer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BusinessMetrics {
    pub expected_revenue_loss: f64,
    pub priority_score: f64,
}

/// Derives expected loss and priority from a validated probability and revenue.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BusinessMetricsCalculator {
    formula: PriorityFormula,
}

impl BusinessMetricsCalculator {
    pub fn new(formula: PriorityFormula) -> Self {
        Self { formula }
    }

    pub fn formula(&self) -> PriorityFormula {
        self.formula
    }

    pub fn compute(&self, probability: f64, revenue: f64) -> BusinessMetrics {
        let expected_revenue_loss = round_to(probability * revenue, 2);
        let priority_score = match self.formula {
            PriorityFormula::ProbabilityWeighted => {
                round_to(probability * expected_revenue_loss, 4)
            }
            PriorityFormula::ExpectedLoss => expected_revenue_loss,
        };
        BusinessMetrics {
            expected_revenue_loss,
            priority_score,
        }
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
