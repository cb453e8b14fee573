mod cli;
mod infra;
mod routes;
mod server;
mod sweep;

use homeward::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
