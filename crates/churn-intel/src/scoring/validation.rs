use super::contract::FeatureContract;
use super::encoder::EncodingSpec;
use super::error::ValidationError;
use super::record::{normalize_name, AttributeValue, NormalizedRecord};

/// Boundary checks applied before a record enters the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordValidator {
    revenue_attribute: String,
    required: Vec<String>,
}

impl RecordValidator {
    pub fn new(revenue_attribute: &str) -> Self {
        Self {
            revenue_attribute: normalize_name(revenue_attribute),
            required: Vec::new(),
        }
    }

    pub fn require(mut self, attribute: &str) -> Self {
        self.required.push(normalize_name(attribute));
        self
    }

    pub fn revenue_attribute(&self) -> &str {
        &self.revenue_attribute
    }

    /// Check required attributes and resolve the revenue used for business
    /// metrics. An explicit amount wins over the revenue attribute.
    pub fn validate(
        &self,
        record: &NormalizedRecord,
        explicit_revenue: Option<f64>,
    ) -> Result<f64, ValidationError> {
        if let Some(missing) = self.required.iter().find(|name| !record.contains(name)) {
            return Err(ValidationError::MissingAttribute(missing.clone()));
        }

        let revenue = match explicit_revenue {
            Some(amount) => amount,
            None => record
                .get(&self.revenue_attribute)
                .ok_or_else(|| ValidationError::MissingRevenue(self.revenue_attribute.clone()))?
                .as_number()
                .ok_or_else(|| ValidationError::NonNumericRevenue(self.revenue_attribute.clone()))?,
        };

        if !revenue.is_finite() || revenue <= 0.0 {
            return Err(ValidationError::NonPositiveRevenue(revenue));
        }
        Ok(revenue)
    }

    /// Attributes naming a non-categorical contract feature must carry a number.
    pub fn check_numeric_features(
        &self,
        record: &NormalizedRecord,
        contract: &FeatureContract,
        encoding: &EncodingSpec,
    ) -> Result<(), ValidationError> {
        for (name, value) in record.iter() {
            if !contract.contains(name) || encoding.is_categorical(name) {
                continue;
            }
            if let AttributeValue::Categorical(_) = value {
                if value.as_number().is_none() {
                    return Err(ValidationError::NonNumericAttribute(name.clone()));
                }
            }
        }
        Ok(())
    }
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new("monthlycharges")
    }
}
