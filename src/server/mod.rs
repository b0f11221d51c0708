//! HTTP surface
//!
//! Thin axum layer over [`Pipeline`]: text and upload endpoints that run a request
//! end to end, plus downloads for the generated artifacts.

pub mod error;
pub mod routes;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::ai::RequirementsClient;
use crate::config::AppConfig;
use crate::pipeline::Pipeline;

pub use error::{ErrorBody, ServerError};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Pipeline, max_upload_bytes: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            max_upload_bytes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/process-text/", post(routes::process_text))
        .route("/upload-file/", post(routes::upload_file))
        .route("/download-word/", get(routes::download_word))
        .route("/download-excel/", get(routes::download_excel))
        .route("/download-word/:request_id", get(routes::download_word_for))
        .route("/download-excel/:request_id", get(routes::download_excel_for))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: AppConfig) -> std::io::Result<()> {
    let client = RequirementsClient::new(config.llm.clone());
    let pipeline = Pipeline::new(&config, Arc::new(client));
    let app = router(AppState::new(pipeline, config.max_upload_bytes));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    tracing::info!(
        addr = %addr,
        provider = %config.llm.provider,
        model = %config.llm.model,
        layout = config.artifact_layout.as_str(),
        "[Server] Listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("[Server] Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[Server] Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("[Server] Shutdown signal received");
}
