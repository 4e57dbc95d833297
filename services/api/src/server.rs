use crate::cli::ServeArgs;
use crate::infra::{load_scoring_context, AppState, InMemoryOutcomeStore};
use crate::routes::{with_scoring_routes, ScoringState};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use churn_intel::config::AppConfig;
use churn_intel::error::AppError;
use churn_intel::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let context = Arc::new(load_scoring_context(&config.scoring, None)?);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let scoring_state = ScoringState {
        context,
        store: InMemoryOutcomeStore::default(),
    };

    let app = with_scoring_routes(scoring_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "churn scoring service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
