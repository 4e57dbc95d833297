use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::aligner::align;
use super::context::ScoringContext;
use super::encoder::{CategoricalEncoder, UnseenCategory};
use super::error::ScoringError;
use super::record::RawRecord;
use super::risk::RiskTier;
use crate::telemetry::DRIFT_TARGET;

/// Inbound scoring payload for one customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Overrides the configured revenue attribute when present.
    #[serde(default)]
    pub revenue: Option<f64>,
    pub attributes: RawRecord,
}

impl ScoringRequest {
    pub fn new(attributes: RawRecord) -> Self {
        Self {
            customer_id: None,
            revenue: None,
            attributes,
        }
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_revenue(mut self, revenue: f64) -> Self {
        self.revenue = Some(revenue);
        self
    }
}

/// Schema drift observed while scoring a record. Scoring still succeeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriftReport {
    /// Encoded columns discarded because the contract does not list them.
    pub dropped_columns: Vec<String>,
    /// Non-indicator contract features the record did not supply (zero-filled).
    pub missing_features: Vec<String>,
    pub unseen_categories: Vec<UnseenCategory>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_columns.is_empty()
            && self.missing_features.is_empty()
            && self.unseen_categories.is_empty()
    }
}

/// Scored, classified, and prioritized result for one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredOutcome {
    pub customer_id: Option<String>,
    pub churn_probability: f64,
    pub risk_tier: RiskTier,
    pub revenue: f64,
    pub expected_revenue_loss: f64,
    pub priority_score: f64,
    pub drift: DriftReport,
}

/// Pipeline states in the order a record moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoringStage {
    Received,
    Normalized,
    Encoded,
    Aligned,
    Scaled,
    Scored,
    Classified,
    Finalized,
}

impl ScoringStage {
    /// Tag reported when a record cannot reach this stage.
    pub const fn failure_tag(self) -> &'static str {
        match self {
            Self::Received => "RECEIVE_FAILED",
            Self::Normalized => "NORMALIZATION_FAILED",
            Self::Encoded => "ENCODING_FAILED",
            Self::Aligned => "ALIGNMENT_FAILED",
            Self::Scaled => "SCALING_FAILED",
            Self::Scored => "INFERENCE_FAILED",
            Self::Classified => "CLASSIFICATION_FAILED",
            Self::Finalized => "FINALIZATION_FAILED",
        }
    }
}

/// A record that could not be scored, tagged with the stage it failed to reach.
#[derive(Debug, thiserror::Error)]
#[error("{}: {error}", failure_tag(.stage, .error))]
pub struct ScoringFailure {
    pub stage: ScoringStage,
    pub customer_id: Option<String>,
    #[source]
    pub error: ScoringError,
}

impl ScoringFailure {
    fn new(stage: ScoringStage, customer_id: Option<String>, error: ScoringError) -> Self {
        Self {
            stage,
            customer_id,
            error,
        }
    }

    pub fn tag(&self) -> &'static str {
        failure_tag(&self.stage, &self.error)
    }
}

/// Validation problems are reported as such whichever stage caught them.
fn failure_tag(stage: &ScoringStage, error: &ScoringError) -> &'static str {
    match error {
        ScoringError::Validation(_) => "VALIDATION_FAILED",
        _ => stage.failure_tag(),
    }
}

/// Entry in a batch failure manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureEntry {
    pub index: usize,
    pub customer_id: Option<String>,
    pub tag: &'static str,
    pub message: String,
}

impl FailureEntry {
    pub fn from_failure(index: usize, failure: &ScoringFailure) -> Self {
        Self {
            index,
            customer_id: failure.customer_id.clone(),
            tag: failure.tag(),
            message: failure.error.to_string(),
        }
    }
}

/// Outcomes and isolated failures from scoring a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<ScoredOutcome>,
    pub failures: Vec<FailureEntry>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs records through normalize, encode, align, scale, score, classify.
#[derive(Debug, Clone, Copy)]
pub struct ScoringPipeline<'a> {
    context: &'a ScoringContext,
}

impl<'a> ScoringPipeline<'a> {
    pub fn new(context: &'a ScoringContext) -> Self {
        Self { context }
    }

    pub fn score(&self, request: &ScoringRequest) -> Result<ScoredOutcome, ScoringFailure> {
        let context = self.context;
        let at = |stage: ScoringStage, error: ScoringError| {
            ScoringFailure::new(stage, request.customer_id.clone(), error)
        };

        let normalized = request
            .attributes
            .normalize()
            .map_err(|err| at(ScoringStage::Received, err.into()))?;
        let revenue = context
            .validator()
            .validate(&normalized, request.revenue)
            .map_err(|err| at(ScoringStage::Received, err.into()))?;
        context
            .validator()
            .check_numeric_features(&normalized, context.contract(), context.encoding())
            .map_err(|err| at(ScoringStage::Received, err.into()))?;

        let encoding = CategoricalEncoder::new(context.encoding())
            .encode(&normalized)
            .map_err(|err| at(ScoringStage::Encoded, err))?;

        let alignment = align(&encoding.record, context.contract())
            .map_err(|err| at(ScoringStage::Aligned, err))?;

        let scaled = context
            .rescaler()
            .apply(alignment.vector)
            .map_err(|err| at(ScoringStage::Scaled, err))?;

        let probability = context
            .classifier()
            .predict_proba(scaled.as_slice())
            .map_err(ScoringError::from)
            .and_then(checked_probability)
            .map_err(|err| at(ScoringStage::Scored, err))?;

        let risk_tier = context.thresholds().classify(probability);
        let metrics = context.calculator().compute(probability, revenue);

        let missing_features: Vec<String> = alignment
            .zero_filled
            .into_iter()
            .filter(|column| !context.encoding().is_indicator(column))
            .collect();
        if !missing_features.is_empty() {
            warn!(
                target: DRIFT_TARGET,
                customer_id = request.customer_id.as_deref().unwrap_or("-"),
                missing = ?missing_features,
                "contract features absent from record were zero-filled"
            );
        }

        debug!(
            customer_id = request.customer_id.as_deref().unwrap_or("-"),
            probability,
            tier = risk_tier.label(),
            "record scored"
        );

        Ok(ScoredOutcome {
            customer_id: request.customer_id.clone(),
            churn_probability: probability,
            risk_tier,
            revenue,
            expected_revenue_loss: metrics.expected_revenue_loss,
            priority_score: metrics.priority_score,
            drift: DriftReport {
                dropped_columns: alignment.dropped,
                missing_features,
                unseen_categories: encoding.unseen,
            },
        })
    }

    /// Score every request independently; a failing record lands in the
    /// manifest and the rest of the batch continues.
    pub fn score_batch(&self, requests: &[ScoringRequest]) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, request) in requests.iter().enumerate() {
            match self.score(request) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(failure) => {
                    warn!(
                        index,
                        customer_id = failure.customer_id.as_deref().unwrap_or("-"),
                        tag = failure.tag(),
                        error = %failure.error,
                        "record skipped"
                    );
                    report
                        .failures
                        .push(FailureEntry::from_failure(index, &failure));
                }
            }
        }
        info!(
            scored = report.outcomes.len(),
            failed = report.failures.len(),
            "batch scoring finished"
        );
        report
    }
}

fn checked_probability(probability: f64) -> Result<f64, ScoringError> {
    if probability.is_finite() && (0.0..=1.0).contains(&probability) {
        Ok(probability)
    } else {
        Err(ScoringError::Inference(format!(
            "classifier returned probability {probability} outside [0, 1]"
        )))
    }
}
