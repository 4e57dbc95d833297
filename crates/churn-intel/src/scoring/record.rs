use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// A single attribute value as received from a caller or a CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Numeric(f64),
    Flag(bool),
    Categorical(String),
    /// JSON `null`; dropped during normalization as if never supplied.
    Missing,
}

impl AttributeValue {
    /// Numeric reading of the value; categorical text is accepted when it parses.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Numeric(value) => Some(*value),
            AttributeValue::Flag(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            AttributeValue::Categorical(text) => text.trim().parse::<f64>().ok(),
            AttributeValue::Missing => None,
        }
    }

    /// Category label used to name indicator columns.
    pub fn category_label(&self) -> String {
        match self {
            AttributeValue::Numeric(value) => format!("{value}"),
            AttributeValue::Flag(flag) => flag.to_string(),
            AttributeValue::Categorical(text) => text.clone(),
            AttributeValue::Missing => String::new(),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Numeric(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Numeric(value as f64)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Categorical(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Categorical(value)
    }
}

/// Raw attribute map for one customer, exactly as supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    attributes: BTreeMap<String, AttributeValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes.iter()
    }

    /// Canonicalize names and categorical text. The same rules run for
    /// training exports, batch CSVs, and API payloads.
    pub fn normalize(&self) -> Result<NormalizedRecord, ValidationError> {
        let mut attributes = BTreeMap::new();
        for (name, value) in &self.attributes {
            let key = normalize_name(name);
            if key.is_empty() {
                return Err(ValidationError::EmptyAttributeName);
            }
            let value = match value {
                AttributeValue::Numeric(number) => AttributeValue::Numeric(*number),
                AttributeValue::Flag(flag) => AttributeValue::Categorical(flag.to_string()),
                AttributeValue::Categorical(text) => {
                    AttributeValue::Categorical(normalize_category(text))
                }
                AttributeValue::Missing => continue,
            };
            if attributes.insert(key.clone(), value).is_some() {
                return Err(ValidationError::DuplicateAttribute(key));
            }
        }
        Ok(NormalizedRecord { attributes })
    }
}

impl FromIterator<(String, AttributeValue)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

/// Record whose names and categorical values went through [`RawRecord::normalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    attributes: BTreeMap<String, AttributeValue>,
}

impl NormalizedRecord {
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes.iter()
    }
}

/// Trim, lowercase, and replace each inner space with `_`. Runs of spaces
/// are kept as runs so names match training exports column for column.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_folds_case_and_whitespace() {
        assert_eq!(normalize_name("  MonthlyCharges "), "monthlycharges");
        assert_eq!(normalize_name("Payment Method"), "payment_method");
        assert_eq!(normalize_name("Payment  Method"), "payment__method");
    }

    #[test]
    fn normalize_lowercases_categories_and_keeps_numbers() {
        let record = RawRecord::new()
            .with(" Gender", " Female ")
            .with("Tenure", 12.0);

        let normalized = record.normalize().expect("normalizes");

        assert_eq!(
            normalized.get("gender"),
            Some(&AttributeValue::Categorical("female".to_string()))
        );
        assert_eq!(normalized.get("tenure"), Some(&AttributeValue::Numeric(12.0)));
    }

    #[test]
    fn normalize_rejects_names_that_collide() {
        let record = RawRecord::new().with("Tenure", 12.0).with("tenure ", 13.0);

        let err = record.normalize().expect_err("collision rejected");

        assert_eq!(err, ValidationError::DuplicateAttribute("tenure".to_string()));
    }

    #[test]
    fn untagged_values_deserialize_from_json() {
        let record: RawRecord =
            serde_json::from_str(r#"{"tenure": 12, "contract": "Month-to-month"}"#)
                .expect("valid json");

        assert_eq!(record.get("tenure"), Some(&AttributeValue::Numeric(12.0)));
        assert_eq!(
            record.get("contract").and_then(AttributeValue::as_number),
            None
        );
    }

    #[test]
    fn null_and_boolean_values_deserialize() {
        let record: RawRecord = serde_json::from_str(
            r#"{"tenure": 12, "gender": null, "PaperlessBilling": true}"#,
        )
        .expect("valid json");

        assert_eq!(record.get("gender"), Some(&AttributeValue::Missing));
        assert_eq!(record.get("PaperlessBilling"), Some(&AttributeValue::Flag(true)));

        let normalized = record.normalize().expect("normalizes");
        assert!(!normalized.contains("gender"));
        assert_eq!(
            normalized.get("paperlessbilling"),
            Some(&AttributeValue::Categorical("true".to_string()))
        );
    }

    #[test]
    fn null_does_not_collide_with_a_supplied_value() {
        let record = RawRecord::new()
            .with("Gender", AttributeValue::Missing)
            .with("gender", "Male");

        let normalized = record.normalize().expect("normalizes");

        assert_eq!(
            normalized.get("gender"),
            Some(&AttributeValue::Categorical("male".to_string()))
        );
    }

    #[test]
    fn numeric_category_labels_drop_trailing_zero() {
        assert_eq!(AttributeValue::Numeric(1.0).category_label(), "1");
        assert_eq!(AttributeValue::Numeric(0.5).category_label(), "0.5");
    }
}
