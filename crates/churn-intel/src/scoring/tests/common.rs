use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::scoring::{
    Classifier, ClassifierError, EncodingSpec, FeatureContract, FixedProbability, LogisticModel,
    PriorityFormula, RawRecord, ScoringContext, ScoringRequest, Thresholds,
};

pub(super) fn contract() -> FeatureContract {
    FeatureContract::new([
        "tenure",
        "monthlycharges",
        "totalcharges",
        "gender_male",
        "seniorcitizen_yes",
        "contract_one_year",
        "contract_two_year",
    ])
    .expect("valid contract")
}

pub(super) fn encoding() -> EncodingSpec {
    EncodingSpec::new()
        .with_category("gender", Some("female"), &["male"])
        .with_category("seniorcitizen", Some("no"), &["yes"])
        .with_category("contract", Some("month-to-month"), &["one_year", "two_year"])
}

pub(super) fn telco_record() -> RawRecord {
    RawRecord::new()
        .with("tenure", 12.0)
        .with("monthlycharges", 70.0)
        .with("totalcharges", 840.0)
        .with("gender", "female")
        .with("seniorcitizen", "no")
        .with("contract", "month-to-month")
}

pub(super) fn telco_request() -> ScoringRequest {
    ScoringRequest::new(telco_record()).with_customer_id("7590-VHVEG")
}

pub(super) fn thresholds() -> Thresholds {
    Thresholds::new(0.4, 0.6).expect("valid thresholds")
}

pub(super) fn stub_context(probability: f64) -> ScoringContext {
    ScoringContext::builder(contract())
        .encoding(encoding())
        .classifier(FixedProbability(probability))
        .thresholds(thresholds())
        .priority_formula(PriorityFormula::ExpectedLoss)
        .build()
        .expect("context builds")
}

pub(super) fn context_with(classifier: impl Classifier + 'static) -> ScoringContext {
    ScoringContext::builder(contract())
        .encoding(encoding())
        .classifier(classifier)
        .thresholds(thresholds())
        .build()
        .expect("context builds")
}

pub(super) fn logistic_model() -> LogisticModel {
    let coefficients: BTreeMap<String, f64> = [
        ("tenure", -0.05),
        ("monthlycharges", 0.02),
        ("totalcharges", -0.0002),
        ("gender_male", 0.01),
        ("seniorcitizen_yes", 0.3),
        ("contract_one_year", -0.8),
        ("contract_two_year", -1.5),
    ]
    .into_iter()
    .map(|(name, weight)| (name.to_string(), weight))
    .collect();

    LogisticModel {
        intercept: -0.4,
        coefficients,
    }
}

/// Records every vector it is asked to score. Clones share the log.
#[derive(Clone, Default)]
pub(super) struct RecordingClassifier {
    seen: Arc<Mutex<Vec<Vec<f64>>>>,
}

impl RecordingClassifier {
    pub(super) fn last_vector(&self) -> Vec<f64> {
        self.seen
            .lock()
            .expect("recording mutex poisoned")
            .last()
            .cloned()
            .expect("classifier was called")
    }
}

impl Classifier for RecordingClassifier {
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ClassifierError> {
        self.seen
            .lock()
            .expect("recording mutex poisoned")
            .push(features.to_vec());
        Ok(0.5)
    }
}

pub(super) struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn predict_proba(&self, _features: &[f64]) -> Result<f64, ClassifierError> {
        Err(ClassifierError::Model("model backend unavailable".to_string()))
    }
}

pub(super) fn scratch_dir(label: &str) -> PathBuf {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);
    let id = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "churn-intel-{label}-{}-{id}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
