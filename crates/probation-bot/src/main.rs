//! Probation bot binary.

use probation_bot::{logging, BotConfig, ProbationService};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A .env file is optional; real environment variables take precedence.
    dotenvy::dotenv().ok();

    // Missing startup parameters stop the process here.
    let config = BotConfig::from_env()?;

    logging::init(config.log_file.as_deref())?;
    tracing::info!("Application started");

    let service = Arc::new(ProbationService::open(config)?);
    service.run().await?;

    Ok(())
}
