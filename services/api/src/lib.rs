mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use circuit::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
