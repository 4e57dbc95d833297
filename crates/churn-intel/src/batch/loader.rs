use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::sink::{OutcomeSink, ScoredRecord};
use crate::scoring::{FailureEntry, ScoringContext, ScoringPipeline, ScoringRequest};

/// Manifest tag for records that scored but could not be stored.
pub const PERSISTENCE_FAILED: &str = "PERSISTENCE_FAILED";

/// Result of a batch run: what was stored and what was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub model_version: String,
    pub batch_run_date: NaiveDate,
    pub records: Vec<ScoredRecord>,
    pub failures: Vec<FailureEntry>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    pub fn persisted(&self) -> usize {
        self.records.len()
    }
}

/// Scores requests and hands every outcome to a sink, one record at a time.
pub struct BatchLoader<'a> {
    pipeline: ScoringPipeline<'a>,
    sink: &'a dyn OutcomeSink,
    model_version: String,
    run_date: NaiveDate,
}

impl<'a> BatchLoader<'a> {
    pub fn new(context: &'a ScoringContext, sink: &'a dyn OutcomeSink) -> Self {
        Self {
            pipeline: ScoringPipeline::new(context),
            sink,
            model_version: context.model_version().to_string(),
            run_date: Utc::now().date_naive(),
        }
    }

    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = run_date;
        self
    }

    pub fn run(&self, requests: &[ScoringRequest]) -> BatchSummary {
        let mut summary = BatchSummary {
            model_version: self.model_version.clone(),
            batch_run_date: self.run_date,
            records: Vec::with_capacity(requests.len()),
            failures: Vec::new(),
        };

        for (index, request) in requests.iter().enumerate() {
            let outcome = match self.pipeline.score(request) {
                Ok(outcome) => outcome,
                Err(failure) => {
                    warn!(
                        index,
                        tag = failure.tag(),
                        error = %failure.error,
                        "record skipped"
                    );
                    summary
                        .failures
                        .push(FailureEntry::from_failure(index, &failure));
                    continue;
                }
            };

            let customer_id = outcome
                .customer_id
                .clone()
                .unwrap_or_else(|| (index + 1).to_string());
            let record = ScoredRecord::from_outcome(
                &outcome,
                customer_id,
                &self.model_version,
                self.run_date,
            );

            match self.sink.persist(&record) {
                Ok(()) => summary.records.push(record),
                Err(err) => {
                    warn!(
                        index,
                        customer_id = record.customer_id.as_str(),
                        error = %err,
                        "scored record not persisted"
                    );
                    summary.failures.push(FailureEntry {
                        index,
                        customer_id: Some(record.customer_id),
                        tag: PERSISTENCE_FAILED,
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            model_version = summary.model_version.as_str(),
            run_date = %summary.batch_run_date,
            persisted = summary.persisted(),
            failed = summary.failures.len(),
            "batch load finished"
        );
        summary
    }
}
