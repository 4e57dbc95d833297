use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::encoder::EncodingSpec;
use super::record::normalize_name;

/// Errors raised while building a feature contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("feature '{0}' is listed more than once")]
    DuplicateFeature(String),
    #[error("feature name at position {0} is empty")]
    EmptyFeature(usize),
}

/// Ordered feature names fixed when the model was trained.
///
/// Every vector handed to a classifier has exactly `len()` entries in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureContract {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureContract {
    pub fn new<I, S>(names: I) -> Result<Self, ContractError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered = Vec::new();
        let mut positions = HashMap::new();
        for (index, raw) in names.into_iter().enumerate() {
            let name = normalize_name(raw.as_ref());
            if name.is_empty() {
                return Err(ContractError::EmptyFeature(index));
            }
            if positions.insert(name.clone(), index).is_some() {
                return Err(ContractError::DuplicateFeature(name));
            }
            ordered.push(name);
        }
        Ok(Self {
            names: ordered,
            positions,
        })
    }

    /// Build the training-time layout: numeric columns first, then the
    /// indicator columns of each categorical attribute in the given order.
    pub fn from_encoding(
        numeric: &[&str],
        encoding: &EncodingSpec,
        categorical_order: &[&str],
    ) -> Result<Self, ContractError> {
        let mut names: Vec<String> = numeric.iter().map(|name| name.to_string()).collect();
        for attribute in categorical_order {
            let attribute = normalize_name(attribute);
            if let Some(feature) = encoding.get(&attribute) {
                names.extend(feature.indicator_columns(&attribute));
            }
        }
        Self::new(names)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for FeatureContract {
    type Error = ContractError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FeatureContract> for Vec<String> {
    fn from(value: FeatureContract) -> Self {
        value.names
    }
}
