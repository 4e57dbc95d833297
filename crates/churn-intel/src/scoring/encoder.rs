use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::contract::FeatureContract;
use super::error::ScoringError;
use super::record::{normalize_category, normalize_name, AttributeValue, NormalizedRecord};
use crate::telemetry::DRIFT_TARGET;

/// Encoding of one categorical attribute: the dropped reference value and the
/// values that own an indicator column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalFeature {
    /// `None` when the spec was inferred from a contract and the training
    /// baseline was never persisted.
    #[serde(default)]
    pub baseline: Option<String>,
    pub levels: Vec<String>,
}

impl CategoricalFeature {
    pub fn indicator_columns(&self, attribute: &str) -> Vec<String> {
        self.levels
            .iter()
            .map(|level| indicator_name(attribute, level))
            .collect()
    }

    fn knows(&self, value: &str) -> bool {
        self.baseline.as_deref() == Some(value) || self.levels.iter().any(|level| level == value)
    }
}

/// Persisted categorical layout, stored next to the feature contract as `encoding.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodingSpec {
    categories: BTreeMap<String, CategoricalFeature>,
}

impl EncodingSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(
        mut self,
        attribute: &str,
        baseline: Option<&str>,
        levels: &[&str],
    ) -> Self {
        self.categories.insert(
            normalize_name(attribute),
            CategoricalFeature {
                baseline: baseline.map(level_key),
                levels: levels.iter().map(|level| level_key(level)).collect(),
            },
        );
        self
    }

    /// Learn the layout from training records: each attribute's values sorted,
    /// the first one becomes the baseline (drop-first).
    pub fn fit<'a, I>(records: I, categorical: &[&str]) -> Self
    where
        I: IntoIterator<Item = &'a NormalizedRecord>,
    {
        let attributes: Vec<String> = categorical.iter().map(|name| normalize_name(name)).collect();
        let mut seen: BTreeMap<&str, BTreeSet<String>> = attributes
            .iter()
            .map(|name| (name.as_str(), BTreeSet::new()))
            .collect();

        for record in records {
            for (attribute, values) in seen.iter_mut() {
                if let Some(value) = record.get(attribute) {
                    values.insert(level_key(&value.category_label()));
                }
            }
        }

        let categories = seen
            .into_iter()
            .map(|(attribute, values)| {
                let mut values = values.into_iter();
                let baseline = values.next();
                (
                    attribute.to_string(),
                    CategoricalFeature {
                        baseline,
                        levels: values.collect(),
                    },
                )
            })
            .collect();

        Self { categories }
    }

    /// Recover indicator levels from an existing contract when no encoding
    /// artifact was persisted. Baselines stay unknown.
    pub fn infer_from_contract(contract: &FeatureContract, categorical: &[&str]) -> Self {
        let mut categories = BTreeMap::new();
        for attribute in categorical {
            let attribute = normalize_name(attribute);
            let prefix = format!("{attribute}_");
            let levels: Vec<String> = contract
                .iter()
                .filter_map(|column| column.strip_prefix(&prefix))
                .map(str::to_string)
                .collect();
            if levels.is_empty() {
                continue;
            }
            categories.insert(
                attribute,
                CategoricalFeature {
                    baseline: None,
                    levels,
                },
            );
        }
        if !categories.is_empty() {
            warn!(
                target: DRIFT_TARGET,
                attributes = categories.len(),
                "encoding inferred from feature contract; categorical baselines are unknown"
            );
        }
        Self { categories }
    }

    pub fn get(&self, attribute: &str) -> Option<&CategoricalFeature> {
        self.categories.get(attribute)
    }

    pub fn is_categorical(&self, attribute: &str) -> bool {
        self.categories.contains_key(attribute)
    }

    /// True when `column` is one of the indicator columns this spec produces.
    pub fn is_indicator(&self, column: &str) -> bool {
        self.categories.iter().any(|(attribute, feature)| {
            column
                .strip_prefix(attribute.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|level| feature.levels.iter().any(|known| known == level))
                .unwrap_or(false)
        })
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }
}

/// Numeric columns produced from a record before alignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedRecord {
    columns: BTreeMap<String, f64>,
}

impl EncodedRecord {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), *value))
    }

    fn put(&mut self, column: String, value: f64) -> Result<(), ScoringError> {
        if self.columns.contains_key(&column) {
            return Err(ScoringError::EncodingAmbiguity { column });
        }
        self.columns.insert(column, value);
        Ok(())
    }
}

impl FromIterator<(String, f64)> for EncodedRecord {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// A categorical value absent from the training layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnseenCategory {
    pub attribute: String,
    pub value: String,
}

/// Encoder output: the columns plus any unseen categorical values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Encoding {
    pub record: EncodedRecord,
    pub unseen: Vec<UnseenCategory>,
}

/// One-hot expansion against a persisted [`EncodingSpec`].
#[derive(Debug, Clone, Copy)]
pub struct CategoricalEncoder<'a> {
    spec: &'a EncodingSpec,
}

impl<'a> CategoricalEncoder<'a> {
    pub fn new(spec: &'a EncodingSpec) -> Self {
        Self { spec }
    }

    pub fn encode(&self, record: &NormalizedRecord) -> Result<Encoding, ScoringError> {
        let mut encoded = EncodedRecord::default();
        let mut unseen = Vec::new();

        for (attribute, value) in record.iter() {
            if let Some(feature) = self.spec.get(attribute) {
                let label = level_key(&value.category_label());
                if feature.baseline.as_deref() == Some(label.as_str()) {
                    continue;
                }
                if !feature.knows(&label) {
                    if feature.baseline.is_none() {
                        // Without a persisted baseline an unknown value is
                        // indistinguishable from the reference category.
                        debug!(
                            target: DRIFT_TARGET,
                            attribute = attribute.as_str(),
                            value = label.as_str(),
                            "unknown categorical value treated as a possible baseline"
                        );
                        continue;
                    }
                    warn!(
                        target: DRIFT_TARGET,
                        attribute = attribute.as_str(),
                        value = label.as_str(),
                        "categorical value not seen during training"
                    );
                    unseen.push(UnseenCategory {
                        attribute: attribute.clone(),
                        value: label.clone(),
                    });
                }
                encoded.put(indicator_name(attribute, &label), 1.0)?;
                continue;
            }

            match value {
                AttributeValue::Numeric(number) => encoded.put(attribute.clone(), *number)?,
                AttributeValue::Categorical(text) => match text.parse::<f64>() {
                    Ok(number) => encoded.put(attribute.clone(), number)?,
                    // Unknown categorical attribute: expand naively, alignment decides.
                    Err(_) => encoded.put(indicator_name(attribute, &level_key(text)), 1.0)?,
                },
                AttributeValue::Flag(flag) => {
                    encoded.put(attribute.clone(), if *flag { 1.0 } else { 0.0 })?
                }
                AttributeValue::Missing => {}
            }
        }

        Ok(Encoding {
            record: encoded,
            unseen,
        })
    }
}

pub fn indicator_name(attribute: &str, level: &str) -> String {
    format!("{attribute}_{level}")
}

/// Canonical level text: normalized category with inner whitespace joined by `_`,
/// so `"Two year"` and `two_year` name the same indicator.
pub fn level_key(raw: &str) -> String {
    normalize_category(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}
