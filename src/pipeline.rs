//! Request pipeline
//!
//! One request runs extraction, the requirements call, parsing and emission in that
//! order. Extraction and emission are CPU/file bound and run on the blocking pool;
//! the API call is the only awaited network operation. Nothing is written to the
//! output directory unless the API call succeeds.

use crate::ai::{ApiError, RequirementExtractor};
use crate::config::AppConfig;
use crate::emit::{emit_all, ArtifactLayout, EmitError, GeneratedArtifacts};
use crate::extraction::{DocumentFormat, ExtractionError, TextExtractor};
use crate::requirements::{HeadingParser, RequirementSet, ResponseParser};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No text to analyze")]
    EmptyInput,

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("Failed to stage upload {path:?}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Identity and output paths of one in-flight request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub artifacts: GeneratedArtifacts,
}

impl RequestContext {
    pub fn new(layout: ArtifactLayout, output_dir: &Path) -> Self {
        let request_id = Uuid::new_v4();
        Self {
            request_id,
            artifacts: layout.resolve(output_dir, request_id),
        }
    }
}

/// Result of a successful request
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub request_id: Uuid,
    pub artifacts: GeneratedArtifacts,
    pub raw_response: String,
    pub requirements: RequirementSet,
    pub generated_at: DateTime<Utc>,
}

pub struct Pipeline {
    extractor: Arc<dyn RequirementExtractor>,
    parser: Arc<dyn ResponseParser>,
    text_extractor: TextExtractor,
    upload_dir: PathBuf,
    output_dir: PathBuf,
    layout: ArtifactLayout,
    keep_uploads: bool,
}

impl Pipeline {
    pub fn new(config: &AppConfig, extractor: Arc<dyn RequirementExtractor>) -> Self {
        Self {
            extractor,
            parser: Arc::new(HeadingParser),
            text_extractor: TextExtractor::new(),
            upload_dir: config.upload_dir.clone(),
            output_dir: config.output_dir.clone(),
            layout: config.artifact_layout,
            keep_uploads: config.keep_uploads,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn ResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Analyze raw text and write both artifacts
    pub async fn process_text(&self, text: &str) -> Result<ProcessOutcome, PipelineError> {
        let ctx = RequestContext::new(self.layout, &self.output_dir);
        tracing::info!(
            request_id = %ctx.request_id,
            chars = text.len(),
            "[Pipeline] Processing text"
        );
        self.run(ctx, text).await
    }

    /// Stage an uploaded file, extract its text, then continue as [`Self::process_text`]
    pub async fn process_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ProcessOutcome, PipelineError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let format = DocumentFormat::from_extension(extension)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(extension.to_string()))?;

        let ctx = RequestContext::new(self.layout, &self.output_dir);
        tracing::info!(
            request_id = %ctx.request_id,
            filename,
            format = %format,
            bytes = bytes.len(),
            "[Pipeline] Processing upload"
        );

        let staging_dir = self.upload_dir.join(ctx.request_id.to_string());
        let staged = staging_dir.join(sanitize_filename(filename));

        tokio::fs::create_dir_all(&staging_dir)
            .await
            .map_err(|source| PipelineError::Staging {
                path: staging_dir.clone(),
                source,
            })?;
        tokio::fs::write(&staged, &bytes)
            .await
            .map_err(|source| PipelineError::Staging {
                path: staged.clone(),
                source,
            })?;

        let extractor = self.text_extractor;
        let path = staged.clone();
        let extracted =
            tokio::task::spawn_blocking(move || extractor.extract_format(&path, format)).await;

        if self.keep_uploads {
            tracing::debug!("[Pipeline] Keeping staged upload {}", staged.display());
        } else if let Err(e) = tokio::fs::remove_dir_all(&staging_dir).await {
            tracing::warn!(
                "[Pipeline] Failed to remove staged upload {}: {}",
                staging_dir.display(),
                e
            );
        }

        let text = extracted??;
        self.run(ctx, &text).await
    }

    async fn run(&self, ctx: RequestContext, text: &str) -> Result<ProcessOutcome, PipelineError> {
        if text.trim().is_empty() {
            tracing::warn!(request_id = %ctx.request_id, "[Pipeline] Empty input rejected");
            return Err(PipelineError::EmptyInput);
        }

        let raw_response = match self.extractor.extract_requirements(text).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(request_id = %ctx.request_id, "[Pipeline] Requirements call failed: {}", e);
                return Err(e.into());
            }
        };

        let requirements = self.parser.parse(&raw_response);
        tracing::info!(
            request_id = %ctx.request_id,
            functional = requirements.functional.len(),
            non_functional = requirements.non_functional.len(),
            "[Pipeline] Parsed reply"
        );

        let set = requirements.clone();
        let artifacts = ctx.artifacts.clone();
        tokio::task::spawn_blocking(move || emit_all(&set, &artifacts)).await??;

        tracing::info!(request_id = %ctx.request_id, "[Pipeline] Request complete");

        Ok(ProcessOutcome {
            request_id: ctx.request_id,
            artifacts: ctx.artifacts,
            raw_response,
            requirements,
            generated_at: Utc::now(),
        })
    }
}

/// Reduce a client-supplied filename to a safe single path component
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
