pub mod commands;
pub mod data;
pub mod errors;
pub mod models;
pub mod render;
pub mod utils;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::errors::{AppError, ErrorResponse};
use crate::models::config::AppConfig;

/// Initialize logging, load configuration from the environment, and run one update.
pub fn run() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting market tracker");

    let result = AppConfig::from_env().and_then(|config| {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AppError::Internal(format!("Cannot start runtime: {}", e)))?;
        runtime.block_on(commands::run_pipeline(&config))
    });

    match result {
        Ok(summary) => {
            info!(
                "Run complete: {} quotes, {} snapshots kept, {} bars charted",
                summary.quotes, summary.snapshots, summary.candles
            );
            Ok(())
        }
        Err(err) => {
            let response = ErrorResponse::from(&err);
            error!(code = %response.code, kind = ?response.kind, "Run failed: {}", response.message);
            Err(err)
        }
    }
}
