//! Churn risk scoring: feature-contract reconciliation, probability scoring,
//! risk tiering, and the batch/insight collaborators built around them.

pub mod batch;
pub mod config;
pub mod error;
pub mod insights;
pub mod scoring;
pub mod telemetry;
