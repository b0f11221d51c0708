use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::error::ServerError;
use super::AppState;
use crate::emit::{ArtifactLayout, GeneratedArtifacts};
use crate::pipeline::ProcessOutcome;

const SUCCESS_MESSAGE: &str = "Files generated successfully!";

#[derive(Debug, Deserialize)]
pub struct ProcessTextRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub message: String,
    pub request_id: Uuid,
    pub word_file: String,
    pub excel_file: String,
    /// Raw model reply
    pub requirements: String,
    pub generated_at: DateTime<Utc>,
}

impl From<ProcessOutcome> for ProcessResponse {
    fn from(outcome: ProcessOutcome) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            request_id: outcome.request_id,
            word_file: outcome.artifacts.word_file.display().to_string(),
            excel_file: outcome.artifacts.excel_file.display().to_string(),
            requirements: outcome.raw_response,
            generated_at: outcome.generated_at,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ArtifactKind {
    Word,
    Excel,
}

impl ArtifactKind {
    fn pick(self, artifacts: GeneratedArtifacts) -> PathBuf {
        match self {
            ArtifactKind::Word => artifacts.word_file,
            ArtifactKind::Excel => artifacts.excel_file,
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn process_text(
    State(state): State<AppState>,
    payload: Result<Json<ProcessTextRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, ServerError> {
    let Json(request) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let outcome = state.pipeline.process_text(&request.text).await?;
    Ok(Json(outcome.into()))
}

pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ServerError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;

    tracing::debug!("[Server] Upload '{}' ({} bytes)", filename, bytes.len());

    let outcome = state.pipeline.process_upload(&filename, bytes).await?;
    Ok(Json(outcome.into()))
}

/// Shared-layout document
pub async fn download_word(State(state): State<AppState>) -> Result<Response, ServerError> {
    send_artifact(shared_artifact(&state, ArtifactKind::Word)).await
}

/// Shared-layout spreadsheet
pub async fn download_excel(State(state): State<AppState>) -> Result<Response, ServerError> {
    send_artifact(shared_artifact(&state, ArtifactKind::Excel)).await
}

pub async fn download_word_for(
    State(state): State<AppState>,
    UrlPath(request_id): UrlPath<String>,
) -> Result<Response, ServerError> {
    send_artifact(request_artifact(&state, &request_id, ArtifactKind::Word)?).await
}

pub async fn download_excel_for(
    State(state): State<AppState>,
    UrlPath(request_id): UrlPath<String>,
) -> Result<Response, ServerError> {
    send_artifact(request_artifact(&state, &request_id, ArtifactKind::Excel)?).await
}

fn shared_artifact(state: &AppState, kind: ArtifactKind) -> PathBuf {
    kind.pick(GeneratedArtifacts::in_dir(state.pipeline.output_dir()))
}

fn request_artifact(
    state: &AppState,
    request_id: &str,
    kind: ArtifactKind,
) -> Result<PathBuf, ServerError> {
    let id = Uuid::parse_str(request_id)
        .map_err(|_| ServerError::BadRequest(format!("'{}' is not a request id", request_id)))?;
    Ok(kind.pick(ArtifactLayout::PerRequest.resolve(state.pipeline.output_dir(), id)))
}

async fn send_artifact(path: PathBuf) -> Result<Response, ServerError> {
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServerError::NotFound(file_name(&path)));
        }
        Err(e) => {
            return Err(ServerError::Internal(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let content_type = mime_guess::from_path(&path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name(&path)),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
