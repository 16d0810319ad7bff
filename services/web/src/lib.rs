mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use disclosure_reports::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
