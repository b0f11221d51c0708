//! HTTP error mapping with `{ "error": message }` bodies

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::extraction::ExtractionError;
use crate::pipeline::PipelineError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler-level errors with HTTP status mapping
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Pipeline(err) => match err {
                PipelineError::EmptyInput => StatusCode::BAD_REQUEST,
                PipelineError::Extraction(ExtractionError::UnsupportedFormat(_)) => {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE
                }
                PipelineError::Api(_) => StatusCode::BAD_GATEWAY,
                PipelineError::Extraction(_)
                | PipelineError::Emit(_)
                | PipelineError::Staging { .. }
                | PipelineError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = ?self, "[Server] Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), "[Server] Rejected request: {}", message);
        }

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
