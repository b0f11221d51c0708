//! Artifact emitters
//!
//! Renders a [`RequirementSet`] into the two deliverables:
//! - `requirements.docx`: titled document with one bulleted section per category
//! - `user_stories.xlsx`: one row per requirement with Type / Requirement / Priority

pub mod document;
pub mod spreadsheet;

use crate::requirements::RequirementSet;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub use document::render_document;
pub use spreadsheet::render_spreadsheet;

pub const WORD_FILE_NAME: &str = "requirements.docx";
pub const EXCEL_FILE_NAME: &str = "user_stories.xlsx";

pub const WORD_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const EXCEL_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to pack document {path:?}: {reason}")]
    Document { path: PathBuf, reason: String },

    #[error("Failed to pack spreadsheet {path:?}: {reason}")]
    Spreadsheet { path: PathBuf, reason: String },
}

/// Where a request's artifacts are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactLayout {
    /// `<output_dir>/<request_id>/...`, no sharing between requests
    #[default]
    PerRequest,
    /// Fixed `<output_dir>/...` paths; concurrent requests overwrite each other
    Shared,
}

impl ArtifactLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerRequest => "per-request",
            Self::Shared => "shared",
        }
    }

    /// Artifact paths for one request under this layout
    pub fn resolve(&self, output_dir: &Path, request_id: Uuid) -> GeneratedArtifacts {
        match self {
            Self::PerRequest => GeneratedArtifacts::in_dir(&output_dir.join(request_id.to_string())),
            Self::Shared => GeneratedArtifacts::in_dir(output_dir),
        }
    }
}

impl FromStr for ArtifactLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per-request" | "per_request" | "request" => Ok(Self::PerRequest),
            "shared" | "fixed" => Ok(Self::Shared),
            other => Err(format!(
                "unknown artifact layout '{}' (expected 'per-request' or 'shared')",
                other
            )),
        }
    }
}

/// Paths of the two generated files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifacts {
    pub word_file: PathBuf,
    pub excel_file: PathBuf,
}

impl GeneratedArtifacts {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            word_file: dir.join(WORD_FILE_NAME),
            excel_file: dir.join(EXCEL_FILE_NAME),
        }
    }
}

/// Write both artifacts, creating parent directories as needed
pub fn emit_all(set: &RequirementSet, artifacts: &GeneratedArtifacts) -> Result<(), EmitError> {
    for path in [&artifacts.word_file, &artifacts.excel_file] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| EmitError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    write_atomically(&artifacts.word_file, |tmp| render_document(set, tmp))?;
    write_atomically(&artifacts.excel_file, |tmp| render_spreadsheet(set, tmp))?;

    tracing::info!(
        "[Emitter] Wrote {} requirements to {} and {}",
        set.len(),
        artifacts.word_file.display(),
        artifacts.excel_file.display()
    );

    Ok(())
}

/// Render into a sibling temp file, then rename over `path`
///
/// Readers never see a partially written artifact; with concurrent writers to the
/// same path the last rename wins.
fn write_atomically<F>(path: &Path, render: F) -> Result<(), EmitError>
where
    F: FnOnce(&Path) -> Result<(), EmitError>,
{
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    if let Err(e) = render(&tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }

    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        EmitError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layout_resolve() {
        let id = Uuid::new_v4();
        let out = Path::new("outputs");

        let per_request = ArtifactLayout::PerRequest.resolve(out, id);
        assert_eq!(
            per_request.word_file,
            out.join(id.to_string()).join(WORD_FILE_NAME)
        );

        let shared = ArtifactLayout::Shared.resolve(out, id);
        assert_eq!(shared.excel_file, out.join(EXCEL_FILE_NAME));
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("shared".parse::<ArtifactLayout>(), Ok(ArtifactLayout::Shared));
        assert_eq!(
            "Per-Request".parse::<ArtifactLayout>(),
            Ok(ArtifactLayout::PerRequest)
        );
        assert!("versioned".parse::<ArtifactLayout>().is_err());
    }

    #[test]
    fn test_emit_all_creates_dirs_and_overwrites() {
        let dir = tempdir().unwrap();
        let artifacts = GeneratedArtifacts::in_dir(&dir.path().join("nested").join("req"));
        let set = RequirementSet::new(vec!["Login".into()], vec!["Fast response".into()]);

        emit_all(&set, &artifacts).unwrap();
        let first = std::fs::read(&artifacts.excel_file).unwrap();

        emit_all(&set, &artifacts).unwrap();
        let second = std::fs::read(&artifacts.excel_file).unwrap();

        assert!(artifacts.word_file.exists());
        assert_eq!(first, second);

        // No temp files left behind
        let names: Vec<_> = std::fs::read_dir(artifacts.word_file.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "unexpected files: {:?}", names);
    }

    #[test]
    fn test_failed_render_keeps_previous_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(WORD_FILE_NAME);
        std::fs::write(&path, b"previous").unwrap();

        let result = write_atomically(&path, |tmp| {
            std::fs::write(tmp, b"partial").unwrap();
            Err(EmitError::Document {
                path: tmp.to_path_buf(),
                reason: "boom".into(),
            })
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"previous");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
