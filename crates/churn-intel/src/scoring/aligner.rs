use serde::Serialize;
use tracing::{debug, warn};

use super::contract::FeatureContract;
use super::encoder::EncodedRecord;
use super::error::ScoringError;
use crate::telemetry::DRIFT_TARGET;

/// Feature values laid out in contract order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AlignedVector {
    values: Vec<f64>,
}

impl AlignedVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }
}

/// Result of projecting an encoded record onto a contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub vector: AlignedVector,
    /// Encoded columns the contract does not list.
    pub dropped: Vec<String>,
    /// Contract columns absent from the record, filled with zero.
    pub zero_filled: Vec<String>,
}

/// Project `encoded` onto `contract`: contract order, zero for absent
/// columns, unknown columns discarded.
pub fn align(encoded: &EncodedRecord, contract: &FeatureContract) -> Result<Alignment, ScoringError> {
    if contract.is_empty() {
        return Err(ScoringError::SchemaMismatch(
            "feature contract is empty".to_string(),
        ));
    }

    let mut values = Vec::with_capacity(contract.len());
    let mut zero_filled = Vec::new();
    for name in contract.iter() {
        match encoded.get(name) {
            Some(value) => values.push(value),
            None => {
                values.push(0.0);
                zero_filled.push(name.to_string());
            }
        }
    }

    let dropped: Vec<String> = encoded
        .columns()
        .filter(|(name, _)| !contract.contains(name))
        .map(|(name, _)| name.to_string())
        .collect();

    if !dropped.is_empty() {
        warn!(
            target: DRIFT_TARGET,
            dropped = ?dropped,
            "encoded columns outside the feature contract were discarded"
        );
    }
    debug!(
        target: DRIFT_TARGET,
        zero_filled = zero_filled.len(),
        width = contract.len(),
        "record aligned to feature contract"
    );

    Ok(Alignment {
        vector: AlignedVector { values },
        dropped,
        zero_filled,
    })
}
