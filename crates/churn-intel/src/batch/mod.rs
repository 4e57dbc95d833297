//! Batch collaborators around the scoring engine: CSV ingestion and cleaning,
//! derived features, and persistence of scored outcomes.

mod features;
mod ingest;
mod loader;
mod sink;

pub use features::{derive_features, tenure_group};
pub use ingest::{CsvIngestor, Dataset, IngestError, LABEL_ATTRIBUTE, NUMERIC_ATTRIBUTES};
pub use loader::{BatchLoader, BatchSummary, PERSISTENCE_FAILED};
pub use sink::{CsvOutcomeSink, OutcomeSink, ScoredRecord, SinkError};
