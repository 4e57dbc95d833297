use crate::infra::{AppState, InMemoryOutcomeStore};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use churn_intel::batch::{BatchLoader, BatchSummary, ScoredRecord};
use churn_intel::error::AppError;
use churn_intel::insights::{self, Kpis, RiskBucketCount, SegmentSummary};
use churn_intel::scoring::{ScoredOutcome, ScoringContext, ScoringPipeline, ScoringRequest};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_CUSTOMER_LIMIT: usize = 100;

/// Shared scoring context plus the store batch results land in.
#[derive(Clone)]
pub(crate) struct ScoringState {
    pub(crate) context: Arc<ScoringContext>,
    pub(crate) store: InMemoryOutcomeStore,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchScoringRequest {
    pub(crate) records: Vec<ScoringRequest>,
    #[serde(default)]
    pub(crate) run_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CustomerQuery {
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

pub(crate) fn scoring_router(state: ScoringState) -> Router {
    Router::new()
        .route("/api/v1/score", post(score_endpoint))
        .route("/api/v1/score/batch", post(batch_score_endpoint))
        .route("/api/customers", get(customers_endpoint))
        .route("/api/kpis", get(kpis_endpoint))
        .route("/api/risk_distribution", get(risk_distribution_endpoint))
        .route("/api/segments", get(segments_endpoint))
        .with_state(state)
}

pub(crate) fn with_scoring_routes(state: ScoringState) -> Router {
    scoring_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn score_endpoint(
    State(state): State<ScoringState>,
    Json(request): Json<ScoringRequest>,
) -> Result<Json<ScoredOutcome>, AppError> {
    let outcome = ScoringPipeline::new(&state.context).score(&request)?;
    Ok(Json(outcome))
}

/// Scores every record, stores the successes, and returns the failure
/// manifest alongside them. Individual failures never fail the request.
pub(crate) async fn batch_score_endpoint(
    State(state): State<ScoringState>,
    Json(payload): Json<BatchScoringRequest>,
) -> Json<BatchSummary> {
    let mut loader = BatchLoader::new(&state.context, &state.store);
    if let Some(date) = payload.run_date {
        loader = loader.with_run_date(date);
    }
    Json(loader.run(&payload.records))
}

pub(crate) async fn customers_endpoint(
    State(state): State<ScoringState>,
    Query(query): Query<CustomerQuery>,
) -> Json<Vec<ScoredRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_CUSTOMER_LIMIT);
    Json(insights::top_priority(&state.store.snapshot(), limit))
}

pub(crate) async fn kpis_endpoint(State(state): State<ScoringState>) -> Json<Kpis> {
    Json(insights::kpis(&state.store.snapshot()))
}

pub(crate) async fn risk_distribution_endpoint(
    State(state): State<ScoringState>,
) -> Json<Vec<RiskBucketCount>> {
    Json(insights::risk_distribution(&state.store.snapshot()))
}

pub(crate) async fn segments_endpoint(
    State(state): State<ScoringState>,
) -> Json<Vec<SegmentSummary>> {
    Json(insights::segments(&state.store.snapshot()))
}
