use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::scoring::{RiskTier, ScoredOutcome};

/// Row persisted for every scored customer in a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub customer_id: String,
    pub churn_probability: f64,
    pub risk_tier: RiskTier,
    pub revenue: f64,
    pub expected_revenue_loss: f64,
    pub priority_score: f64,
    pub model_version: String,
    pub batch_run_date: NaiveDate,
}

impl ScoredRecord {
    pub fn from_outcome(
        outcome: &ScoredOutcome,
        customer_id: String,
        model_version: &str,
        batch_run_date: NaiveDate,
    ) -> Self {
        Self {
            customer_id,
            churn_probability: outcome.churn_probability,
            risk_tier: outcome.risk_tier,
            revenue: outcome.revenue,
            expected_revenue_loss: outcome.expected_revenue_loss,
            priority_score: outcome.priority_score,
            model_version: model_version.to_string(),
            batch_run_date,
        }
    }
}

/// Destination for scored records. Implementations decide how to store them.
pub trait OutcomeSink: Send + Sync {
    fn persist(&self, record: &ScoredRecord) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write scored record: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush scored records: {0}")]
    Io(#[from] std::io::Error),
    #[error("outcome sink unavailable: {0}")]
    Unavailable(String),
}

/// Appends scored records to a CSV file with a header row.
pub struct CsvOutcomeSink<W: Write> {
    writer: Mutex<csv::Writer<W>>,
}

impl CsvOutcomeSink<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        Ok(Self::from_writer(File::create(path)?))
    }
}

impl<W: Write> CsvOutcomeSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: Mutex::new(csv::Writer::from_writer(writer)),
        }
    }

    pub fn flush(&self) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::Unavailable("csv writer lock poisoned".to_string()))?;
        writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        let writer = self
            .writer
            .into_inner()
            .map_err(|_| SinkError::Unavailable("csv writer lock poisoned".to_string()))?;
        writer
            .into_inner()
            .map_err(|err| {
                SinkError::Io(std::io::Error::new(err.error().kind(), err.to_string()))
            })
    }
}

impl<W: Write + Send> OutcomeSink for CsvOutcomeSink<W> {
    fn persist(&self, record: &ScoredRecord) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::Unavailable("csv writer lock poisoned".to_string()))?;
        writer.serialize(record)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(customer_id: &str, tier: RiskTier) -> ScoredRecord {
        ScoredRecord {
            customer_id: customer_id.to_string(),
            churn_probability: 0.82,
            risk_tier: tier,
            revenue: 99.65,
            expected_revenue_loss: 81.71,
            priority_score: 67.0022,
            model_version: "2026.03-logreg".to_string(),
            batch_run_date: NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date"),
        }
    }

    #[test]
    fn csv_sink_writes_header_and_rows() {
        let sink = CsvOutcomeSink::from_writer(Vec::new());
        sink.persist(&record("9305-CDSKC", RiskTier::High))
            .expect("first row written");
        sink.persist(&record("1452-KIOVK", RiskTier::Medium))
            .expect("second row written");

        let bytes = sink.into_inner().expect("writer drained");
        let text = String::from_utf8(bytes).expect("utf8 output");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "customer_id,churn_probability,risk_tier,revenue,expected_revenue_loss,priority_score,model_version,batch_run_date"
        );
        assert_eq!(
            lines[1],
            "9305-CDSKC,0.82,HIGH,99.65,81.71,67.0022,2026.03-logreg,2026-03-14"
        );
        assert!(lines[2].starts_with("1452-KIOVK,0.82,MEDIUM"));
    }

    #[test]
    fn csv_rows_read_back_as_records() {
        let sink = CsvOutcomeSink::from_writer(Vec::new());
        let original = record("9305-CDSKC", RiskTier::Low);
        sink.persist(&original).expect("row written");
        let bytes = sink.into_inner().expect("writer drained");

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let parsed: ScoredRecord = reader
            .deserialize()
            .next()
            .expect("one row")
            .expect("row parses");

        assert_eq!(parsed, original);
    }
}
