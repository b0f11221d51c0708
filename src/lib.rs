pub mod ai;
pub mod config;
pub mod emit;
pub mod extraction;
pub mod pipeline;
pub mod requirements;
pub mod server;

use config::{AppConfig, ConfigError};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize tracing with the RUST_LOG env filter
///
/// Default: warn for most crates, info for this crate and HTTP request traces.
/// Use RUST_LOG=reqgen=debug for per-stage logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,reqgen=info,tower_http=info")),
        )
        .try_init();
}

pub async fn run() -> Result<(), StartupError> {
    // Load .env before reading RUST_LOG so the filter can come from the file too
    config::load_dotenv();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "[Startup] {} via {} ({}), uploads in {}, outputs in {}",
        env!("CARGO_PKG_NAME"),
        config.llm.provider,
        config.llm.model,
        config.upload_dir.display(),
        config.output_dir.display()
    );

    server::serve(config).await?;
    Ok(())
}
