use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::contract::FeatureContract;
use super::error::ScoringError;
use super::record::normalize_name;

/// Errors a classifier can report for a single prediction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("expected {expected} features, received {actual}")]
    WidthMismatch { expected: usize, actual: usize },
    #[error("model failure: {0}")]
    Model(String),
}

/// Binary classifier capability: probability of the positive (churn) class.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ClassifierError>;

    /// Number of features the model was fitted on, when it knows.
    fn input_width(&self) -> Option<usize> {
        None
    }
}

/// Logistic regression coefficients keyed by feature name (`model.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficients: BTreeMap<String, f64>,
}

impl LogisticModel {
    /// Resolve weights to contract order. Every contract column needs a
    /// weight and every weight needs a contract column.
    pub fn bind(&self, contract: &FeatureContract) -> Result<BoundLogisticModel, ScoringError> {
        let coefficients: BTreeMap<String, f64> = self
            .coefficients
            .iter()
            .map(|(name, weight)| (normalize_name(name), *weight))
            .collect();

        if let Some(unknown) = coefficients.keys().find(|name| !contract.contains(name)) {
            return Err(ScoringError::SchemaMismatch(format!(
                "model coefficient '{unknown}' is not part of the feature contract"
            )));
        }

        let weights = contract
            .iter()
            .map(|name| {
                coefficients.get(name).copied().ok_or_else(|| {
                    ScoringError::SchemaMismatch(format!(
                        "model has no coefficient for contract feature '{name}'"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !self.intercept.is_finite() || weights.iter().any(|weight| !weight.is_finite()) {
            return Err(ScoringError::SchemaMismatch(
                "model coefficients must be finite".to_string(),
            ));
        }

        Ok(BoundLogisticModel {
            intercept: self.intercept,
            weights,
        })
    }
}

/// Logistic model with weights laid out in contract order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundLogisticModel {
    intercept: f64,
    weights: Vec<f64>,
}

impl Classifier for BoundLogisticModel {
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ClassifierError> {
        if features.len() != self.weights.len() {
            return Err(ClassifierError::WidthMismatch {
                expected: self.weights.len(),
                actual: features.len(),
            });
        }
        let logit = self.intercept
            + self
                .weights
                .iter()
                .zip(features)
                .map(|(weight, value)| weight * value)
                .sum::<f64>();
        Ok(1.0 / (1.0 + (-logit).exp()))
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.weights.len())
    }
}

/// Constant-probability classifier for tests and dry runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedProbability(pub f64);

impl Classifier for FixedProbability {
    fn predict_proba(&self, _features: &[f64]) -> Result<f64, ClassifierError> {
        Ok(self.0)
    }
}
