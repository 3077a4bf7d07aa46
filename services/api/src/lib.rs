mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use nexus_diagnostics::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
