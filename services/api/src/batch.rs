use crate::infra::{load_scoring_context, parse_date};
use chrono::NaiveDate;
use churn_intel::batch::{
    BatchLoader, BatchSummary, CsvIngestor, CsvOutcomeSink, Dataset, ScoredRecord,
};
use churn_intel::config::AppConfig;
use churn_intel::error::AppError;
use churn_intel::insights;
use churn_intel::scoring::ScoringContext;
use churn_intel::telemetry;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Customer export (CSV) to score
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Destination CSV. Defaults to `<input>_scored.csv` next to the input.
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Artifact directory; overrides CHURN_ARTIFACT_DIR
    #[arg(long)]
    pub(crate) artifacts: Option<PathBuf>,
    /// Add tenure buckets, average spend, and complaint/payment flags before scoring
    #[arg(long)]
    pub(crate) derive_features: bool,
    /// Batch run date stamped on every row (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) run_date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct InsightsArgs {
    /// Customer export (CSV) to score
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Artifact directory; overrides CHURN_ARTIFACT_DIR
    #[arg(long)]
    pub(crate) artifacts: Option<PathBuf>,
    /// Add derived features before scoring
    #[arg(long)]
    pub(crate) derive_features: bool,
    /// Number of customers to list by priority
    #[arg(long, default_value_t = 5)]
    pub(crate) top: usize,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        input,
        output,
        artifacts,
        derive_features,
        run_date,
    } = args;

    let (context, dataset) = prepare(&input, artifacts.as_deref(), derive_features)?;
    let output = output.unwrap_or_else(|| default_output(&input));

    let sink = CsvOutcomeSink::create(&output)?;
    let mut loader = BatchLoader::new(&context, &sink);
    if let Some(date) = run_date {
        loader = loader.with_run_date(date);
    }
    let summary = loader.run(&dataset.requests);
    sink.flush()?;

    render_batch_summary(&input, &output, &dataset, &summary);
    Ok(())
}

pub(crate) fn run_insights(args: InsightsArgs) -> Result<(), AppError> {
    let InsightsArgs {
        input,
        artifacts,
        derive_features,
        top,
    } = args;

    let (context, dataset) = prepare(&input, artifacts.as_deref(), derive_features)?;
    let sink = CsvOutcomeSink::from_writer(std::io::sink());
    let summary = BatchLoader::new(&context, &sink).run(&dataset.requests);

    render_insights(&summary, top);
    Ok(())
}

fn prepare(
    input: &Path,
    artifacts: Option<&Path>,
    derive_features: bool,
) -> Result<(ScoringContext, Dataset), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let context = load_scoring_context(&config.scoring, artifacts)?;
    let dataset = CsvIngestor::new()
        .derive_features(derive_features)
        .read_path(input)?;
    Ok((context, dataset))
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("customers");
    input.with_file_name(format!("{stem}_scored.csv"))
}

fn render_batch_summary(input: &Path, output: &Path, dataset: &Dataset, summary: &BatchSummary) {
    println!("Churn batch scoring");
    println!(
        "- Input {} | {} rows read | {} duplicates removed | {} invalid rows dropped",
        input.display(),
        dataset.rows_read,
        dataset.duplicate_rows,
        dataset.dropped_rows
    );
    println!(
        "- Model {} | run date {}",
        summary.model_version, summary.batch_run_date
    );
    println!(
        "- {} of {} customers scored and written to {}",
        summary.persisted(),
        summary.total(),
        output.display()
    );
    if summary.failures.is_empty() {
        return;
    }
    println!("Failure manifest:");
    for failure in &summary.failures {
        println!(
            "  - row {} [{}] {}: {}",
            failure.index + 1,
            failure.customer_id.as_deref().unwrap_or("-"),
            failure.tag,
            failure.message
        );
    }
}

fn render_insights(summary: &BatchSummary, top: usize) {
    let kpis = insights::kpis(&summary.records);
    println!("Churn insights (model {})", summary.model_version);
    println!(
        "- {} customers | avg churn probability {:.4} | {} high risk ({:.2}%)",
        kpis.total_customers,
        kpis.avg_churn_probability,
        kpis.high_risk_customers,
        kpis.high_risk_pct
    );
    println!(
        "- Revenue {:.2} | revenue at risk {:.2}",
        kpis.total_revenue, kpis.total_revenue_at_risk
    );

    println!("Risk distribution:");
    for bucket in insights::risk_distribution(&summary.records) {
        println!("  - {}: {}", bucket.risk_tier, bucket.count);
    }

    println!("Revenue segments:");
    for segment in insights::segments(&summary.records) {
        println!(
            "  - {}: {} customers | avg probability {:.4} | {:.2} at risk",
            segment.segment,
            segment.customer_count,
            segment.avg_churn_probability,
            segment.revenue_at_risk
        );
    }

    println!("Top {top} customers by priority:");
    for record in insights::top_priority(&summary.records, top) {
        println!("  - {}", describe(&record));
    }

    if !summary.failures.is_empty() {
        println!("{} records could not be scored", summary.failures.len());
    }
}

fn describe(record: &ScoredRecord) -> String {
    format!(
        "{} | {} | probability {:.4} | expected loss {:.2} | priority {:.4}",
        record.customer_id,
        record.risk_tier,
        record.churn_probability,
        record.expected_revenue_loss,
        record.priority_score
    )
}
