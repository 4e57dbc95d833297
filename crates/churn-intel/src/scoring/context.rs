use std::fmt;

use super::artifacts::ScoringArtifacts;
use super::business::{BusinessMetricsCalculator, PriorityFormula};
use super::classifier::Classifier;
use super::contract::FeatureContract;
use super::encoder::EncodingSpec;
use super::error::ScoringError;
use super::rescaler::{Rescaler, ScalerParams};
use super::risk::Thresholds;
use super::validation::RecordValidator;
use crate::config::ScoringConfig;

/// Immutable, load-once scoring artifacts and policy. Built at startup and
/// shared read-only by every pipeline call.
pub struct ScoringContext {
    contract: FeatureContract,
    encoding: EncodingSpec,
    rescaler: Rescaler,
    classifier: Box<dyn Classifier>,
    thresholds: Thresholds,
    calculator: BusinessMetricsCalculator,
    validator: RecordValidator,
    model_version: String,
}

impl ScoringContext {
    pub fn builder(contract: FeatureContract) -> ScoringContextBuilder {
        ScoringContextBuilder {
            contract,
            encoding: EncodingSpec::default(),
            scaler: None,
            classifier: None,
            thresholds: Thresholds::default(),
            priority_formula: PriorityFormula::default(),
            validator: RecordValidator::default(),
            model_version: "unversioned".to_string(),
        }
    }

    /// Bind loaded artifacts to the configured policy.
    pub fn from_artifacts(
        artifacts: ScoringArtifacts,
        config: &ScoringConfig,
    ) -> Result<Self, ScoringError> {
        let encoding = artifacts.encoding_or_inferred();
        let classifier = artifacts.model.bind(&artifacts.contract)?;
        let ScoringArtifacts {
            contract,
            scaler,
            metadata,
            ..
        } = artifacts;

        let mut builder = Self::builder(contract)
            .encoding(encoding)
            .classifier(classifier)
            .thresholds(config.thresholds)
            .priority_formula(config.priority_formula)
            .validator(RecordValidator::new(&config.revenue_attribute))
            .model_version(metadata.model_version);
        if let Some(scaler) = scaler {
            builder = builder.scaler(scaler);
        }
        builder.build()
    }

    pub fn contract(&self) -> &FeatureContract {
        &self.contract
    }

    pub fn encoding(&self) -> &EncodingSpec {
        &self.encoding
    }

    pub fn rescaler(&self) -> &Rescaler {
        &self.rescaler
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn calculator(&self) -> &BusinessMetricsCalculator {
        &self.calculator
    }

    pub fn validator(&self) -> &RecordValidator {
        &self.validator
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }
}

impl fmt::Debug for ScoringContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringContext")
            .field("features", &self.contract.len())
            .field("scaled", &!self.rescaler.is_identity())
            .field("thresholds", &self.thresholds)
            .field("priority_formula", &self.calculator.formula())
            .field("model_version", &self.model_version)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ScoringContext`]; `build` checks the artifacts agree.
pub struct ScoringContextBuilder {
    contract: FeatureContract,
    encoding: EncodingSpec,
    scaler: Option<ScalerParams>,
    classifier: Option<Box<dyn Classifier>>,
    thresholds: Thresholds,
    priority_formula: PriorityFormula,
    validator: RecordValidator,
    model_version: String,
}

impl ScoringContextBuilder {
    pub fn encoding(mut self, encoding: EncodingSpec) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn scaler(mut self, scaler: ScalerParams) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn priority_formula(mut self, formula: PriorityFormula) -> Self {
        self.priority_formula = formula;
        self
    }

    pub fn validator(mut self, validator: RecordValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = version.into();
        self
    }

    pub fn build(self) -> Result<ScoringContext, ScoringError> {
        let classifier = self
            .classifier
            .ok_or_else(|| ScoringError::Inference("no classifier configured".to_string()))?;

        if let Some(width) = classifier.input_width() {
            if width != self.contract.len() {
                return Err(ScoringError::SchemaMismatch(format!(
                    "classifier expects {width} features but the contract lists {}",
                    self.contract.len()
                )));
            }
        }

        let rescaler = Rescaler::from_params(self.scaler.as_ref(), &self.contract)?;

        Ok(ScoringContext {
            contract: self.contract,
            encoding: self.encoding,
            rescaler,
            classifier,
            thresholds: self.thresholds,
            calculator: BusinessMetricsCalculator::new(self.priority_formula),
            validator: self.validator,
            model_version: self.model_version,
        })
    }
}
