use chrono::NaiveDate;
use churn_intel::batch::{OutcomeSink, ScoredRecord, SinkError};
use churn_intel::config::ScoringConfig;
use churn_intel::error::AppError;
use churn_intel::scoring::{ScoringArtifacts, ScoringContext};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Latest scored record per customer; a rerun replaces earlier results.
#[derive(Default, Clone)]
pub(crate) struct InMemoryOutcomeStore {
    records: Arc<Mutex<HashMap<String, ScoredRecord>>>,
}

impl OutcomeSink for InMemoryOutcomeStore {
    fn persist(&self, record: &ScoredRecord) -> Result<(), SinkError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| SinkError::Unavailable("outcome store mutex poisoned".to_string()))?;
        guard.insert(record.customer_id.clone(), record.clone());
        Ok(())
    }
}

impl InMemoryOutcomeStore {
    pub(crate) fn snapshot(&self) -> Vec<ScoredRecord> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<ScoredRecord> = guard.values().cloned().collect();
        records.sort_by(|left, right| left.customer_id.cmp(&right.customer_id));
        records
    }
}

/// Load artifacts from `dir` (or the configured directory) and bind them to
/// the configured scoring policy.
pub(crate) fn load_scoring_context(
    config: &ScoringConfig,
    dir: Option<&Path>,
) -> Result<ScoringContext, AppError> {
    let dir = dir.unwrap_or(config.artifact_dir.as_path());
    let artifacts = ScoringArtifacts::load(dir)?;
    let context = ScoringContext::from_artifacts(artifacts, config)?;
    info!(?context, "scoring context ready");
    Ok(context)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
