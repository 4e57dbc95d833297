use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::aligner::AlignedVector;
use super::contract::FeatureContract;
use super::encoder::EncodedRecord;
use super::error::ScoringError;
use super::record::normalize_name;

/// Standardization parameters for a single column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub mean: f64,
    pub stddev: f64,
}

/// Fitted scaler parameters keyed by column name (`scaler.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScalerParams {
    columns: BTreeMap<String, ColumnScale>,
}

impl ScalerParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: &str, mean: f64, stddev: f64) -> Self {
        self.columns
            .insert(normalize_name(name), ColumnScale { mean, stddev });
        self
    }

    /// Fit mean and population standard deviation for each named column.
    /// Constant columns get a unit deviation so they pass through centered.
    pub fn fit<'a, I>(records: I, columns: &[&str]) -> Result<Self, ScoringError>
    where
        I: IntoIterator<Item = &'a EncodedRecord>,
        I::IntoIter: Clone,
    {
        let records = records.into_iter();
        let mut params = Self::new();
        for column in columns {
            let name = normalize_name(column);
            let values: Vec<f64> = records
                .clone()
                .filter_map(|record| record.get(&name))
                .collect();
            if values.is_empty() {
                return Err(ScoringError::SchemaMismatch(format!(
                    "no training values for scaler column '{name}'"
                )));
            }
            let count = values.len() as f64;
            let mean = values.iter().sum::<f64>() / count;
            let variance = values
                .iter()
                .map(|value| (value - mean).powi(2))
                .sum::<f64>()
                / count;
            let stddev = if variance > 0.0 { variance.sqrt() } else { 1.0 };
            params.columns.insert(name, ColumnScale { mean, stddev });
        }
        Ok(params)
    }

    pub fn get(&self, column: &str) -> Option<ColumnScale> {
        self.columns.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Resolve column names to contract positions. A parameter for a column
    /// the contract does not list means the scaler and contract disagree.
    pub fn bind(&self, contract: &FeatureContract) -> Result<BoundScaler, ScoringError> {
        let mut slots = Vec::with_capacity(self.columns.len());
        for (name, scale) in &self.columns {
            let position = contract.position(name).ok_or_else(|| {
                ScoringError::SchemaMismatch(format!(
                    "scaler column '{name}' is not part of the feature contract"
                ))
            })?;
            if !scale.mean.is_finite() || !scale.stddev.is_finite() || scale.stddev <= 0.0 {
                return Err(ScoringError::SchemaMismatch(format!(
                    "scaler column '{name}' has invalid parameters (mean {}, stddev {})",
                    scale.mean, scale.stddev
                )));
            }
            slots.push((position, *scale));
        }
        slots.sort_by_key(|(position, _)| *position);
        Ok(BoundScaler {
            width: contract.len(),
            slots,
        })
    }
}

/// Scaler parameters resolved against a specific contract.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundScaler {
    width: usize,
    slots: Vec<(usize, ColumnScale)>,
}

impl BoundScaler {
    pub fn scale(&self, mut vector: AlignedVector) -> Result<AlignedVector, ScoringError> {
        if vector.len() != self.width {
            return Err(ScoringError::SchemaMismatch(format!(
                "scaler bound to {} features received {}",
                self.width,
                vector.len()
            )));
        }
        let values = vector.as_mut_slice();
        for (position, scale) in &self.slots {
            values[*position] = (values[*position] - scale.mean) / scale.stddev;
        }
        Ok(vector)
    }
}

/// Optional affine rescaling step. Tree models ship without a scaler.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Rescaler {
    #[default]
    Identity,
    Standard(BoundScaler),
}

impl Rescaler {
    pub fn from_params(
        params: Option<&ScalerParams>,
        contract: &FeatureContract,
    ) -> Result<Self, ScoringError> {
        match params {
            Some(params) => Ok(Self::Standard(params.bind(contract)?)),
            None => Ok(Self::Identity),
        }
    }

    pub fn apply(&self, vector: AlignedVector) -> Result<AlignedVector, ScoringError> {
        match self {
            Rescaler::Identity => Ok(vector),
            Rescaler::Standard(scaler) => scaler.scale(vector),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Rescaler::Identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::aligner::align;

    fn contract() -> FeatureContract {
        FeatureContract::new(["tenure", "monthlycharges", "gender_male"]).expect("valid")
    }

    fn vector(pairs: &[(&str, f64)]) -> AlignedVector {
        let encoded: EncodedRecord = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        align(&encoded, &contract()).expect("aligns").vector
    }

    #[test]
    fn scales_only_named_columns() {
        let params = ScalerParams::new()
            .with_column("tenure", 10.0, 2.0)
            .with_column("monthlycharges", 50.0, 10.0);
        let rescaler = Rescaler::from_params(Some(&params), &contract()).expect("binds");

        let scaled = rescaler
            .apply(vector(&[("tenure", 12.0), ("monthlycharges", 70.0), ("gender_male", 1.0)]))
            .expect("scales");

        assert_eq!(scaled.as_slice(), &[1.0, 2.0, 1.0]);
    }

    #[test]
    fn absent_scaler_passes_through() {
        let rescaler = Rescaler::from_params(None, &contract()).expect("identity");
        let input = vector(&[("tenure", 12.0)]);

        let output = rescaler.apply(input.clone()).expect("identity");

        assert!(rescaler.is_identity());
        assert_eq!(output, input);
    }

    #[test]
    fn binding_to_unknown_column_fails_loudly() {
        let params = ScalerParams::new().with_column("totalcharges", 1000.0, 200.0);

        let err = params.bind(&contract()).expect_err("unknown column");

        assert!(matches!(err, ScoringError::SchemaMismatch(message) if message.contains("totalcharges")));
    }

    #[test]
    fn zero_deviation_is_rejected_at_bind() {
        let params = ScalerParams::new().with_column("tenure", 10.0, 0.0);

        assert!(params.bind(&contract()).is_err());
    }

    #[test]
    fn fit_computes_population_statistics() {
        let records: Vec<EncodedRecord> = [2.0, 4.0, 6.0]
            .iter()
            .map(|tenure| vec![("tenure".to_string(), *tenure), ("flat".to_string(), 3.0)])
            .map(|pairs| pairs.into_iter().collect())
            .collect();

        let params = ScalerParams::fit(&records, &["tenure", "flat"]).expect("fits");

        let tenure = params.get("tenure").expect("tenure fitted");
        assert_eq!(tenure.mean, 4.0);
        assert!((tenure.stddev - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(params.get("flat").map(|scale| scale.stddev), Some(1.0));
    }

    #[test]
    fn parameters_load_from_named_json() {
        let params: ScalerParams =
            serde_json::from_str(r#"{"tenure": {"mean": 32.4, "stddev": 24.5}}"#)
                .expect("valid json");

        assert_eq!(params.len(), 1);
        assert!(params.bind(&contract()).is_ok());
    }
}
