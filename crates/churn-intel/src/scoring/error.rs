use super::classifier::ClassifierError;

/// Failures raised inside the scoring engine.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("feature contract mismatch: {0}")]
    SchemaMismatch(String),
    #[error("indicator column '{column}' would be produced more than once")]
    EncodingAmbiguity { column: String },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<ClassifierError> for ScoringError {
    fn from(value: ClassifierError) -> Self {
        Self::Inference(value.to_string())
    }
}

/// Malformed inbound records, rejected before the pipeline runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("attribute name is empty after normalization")]
    EmptyAttributeName,
    #[error("attribute '{0}' appears more than once after normalization")]
    DuplicateAttribute(String),
    #[error("required attribute '{0}' is missing")]
    MissingAttribute(String),
    #[error("revenue attribute '{0}' is missing and no explicit revenue was supplied")]
    MissingRevenue(String),
    #[error("revenue attribute '{0}' is not numeric")]
    NonNumericRevenue(String),
    #[error("attribute '{0}' feeds a numeric feature but is not a number")]
    NonNumericAttribute(String),
    #[error("revenue must be a positive finite amount (found {0})")]
    NonPositiveRevenue(f64),
}
