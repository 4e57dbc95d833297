mod batch;
mod cli;
mod infra;
mod routes;
mod server;

use churn_intel::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
