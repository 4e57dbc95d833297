//! Feature-contract reconciliation and churn risk scoring.
//!
//! A raw attribute record is normalized, one-hot encoded against the persisted
//! categorical layout, aligned to the training-time feature contract,
//! optionally standardized, scored by a classifier, and finally bucketed into
//! a risk tier with expected-loss and priority figures attached.

mod aligner;
pub mod artifacts;
mod business;
mod classifier;
mod context;
mod contract;
mod encoder;
mod error;
mod pipeline;
mod record;
mod rescaler;
mod risk;
mod validation;

#[cfg(test)]
mod tests;

pub use aligner::{align, AlignedVector, Alignment};
pub use artifacts::{ArtifactError, ModelMetadata, ScoringArtifacts};
pub(crate) use business::round_to;
pub use business::{
    BusinessMetrics, BusinessMetricsCalculator, PriorityFormula, UnknownPriorityFormula,
};
pub use classifier::{
    BoundLogisticModel, Classifier, ClassifierError, FixedProbability, LogisticModel,
};
pub use context::{ScoringContext, ScoringContextBuilder};
pub use contract::{ContractError, FeatureContract};
pub use encoder::{
    indicator_name, level_key, CategoricalEncoder, CategoricalFeature, EncodedRecord, Encoding,
    EncodingSpec, UnseenCategory,
};
pub use error::{ScoringError, ValidationError};
pub use pipeline::{
    BatchReport, DriftReport, FailureEntry, ScoredOutcome, ScoringFailure, ScoringPipeline,
    ScoringRequest, ScoringStage,
};
pub use record::{normalize_category, normalize_name, AttributeValue, NormalizedRecord, RawRecord};
pub use rescaler::{BoundScaler, ColumnScale, Rescaler, ScalerParams};
pub use risk::{classify, RiskTier, ThresholdError, Thresholds};
pub use validation::RecordValidator;
