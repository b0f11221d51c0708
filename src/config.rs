//! Application configuration
//!
//! Read once at startup from the environment (after `.env` is loaded). Every
//! value has a default except the API key of the selected provider.

use crate::ai::{LlmProvider, LlmSettings};
use crate::ai::prompts::DEFAULT_MAX_PROMPT_CHARS;
use crate::emit::ArtifactLayout;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing API key for {provider}: set {vars}")]
    MissingApiKey {
        provider: LlmProvider,
        vars: &'static str,
    },

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub artifact_layout: ArtifactLayout,
    pub max_upload_bytes: usize,
    pub keep_uploads: bool,
}

impl AppConfig {
    /// Load `.env`, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match get("REQGEN_PROVIDER") {
            Some(raw) => raw.parse::<LlmProvider>().map_err(|reason| ConfigError::Invalid {
                key: "REQGEN_PROVIDER",
                reason,
            })?,
            None => LlmProvider::default(),
        };

        let api_key = match provider {
            LlmProvider::Gemini => get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")),
            LlmProvider::OpenAi => get("OPENAI_API_KEY"),
        }
        .ok_or(ConfigError::MissingApiKey {
            provider,
            vars: match provider {
                LlmProvider::Gemini => "GEMINI_API_KEY or GOOGLE_API_KEY",
                LlmProvider::OpenAi => "OPENAI_API_KEY",
            },
        })?;

        let mut llm = LlmSettings::new(provider, api_key)
            .with_timeout(
                parse_var::<u64>(&get, "REQGEN_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs),
            )
            .with_max_prompt_chars(
                parse_var::<usize>(&get, "REQGEN_MAX_PROMPT_CHARS")?.unwrap_or(DEFAULT_MAX_PROMPT_CHARS),
            );
        if let Some(model) = get("REQGEN_MODEL") {
            llm = llm.with_model(model);
        }
        if let Some(base_url) = get("REQGEN_API_BASE_URL") {
            llm = llm.with_base_url(base_url);
        }

        let bind_addr = match parse_var::<SocketAddr>(&get, "REQGEN_BIND_ADDR")? {
            Some(addr) => addr,
            None => DEFAULT_BIND_ADDR
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::Invalid {
                    key: "REQGEN_BIND_ADDR",
                    reason: e.to_string(),
                })?,
        };

        let artifact_layout = match get("REQGEN_ARTIFACT_LAYOUT") {
            Some(raw) => raw.parse::<ArtifactLayout>().map_err(|reason| ConfigError::Invalid {
                key: "REQGEN_ARTIFACT_LAYOUT",
                reason,
            })?,
            None => ArtifactLayout::default(),
        };

        let keep_uploads = match get("REQGEN_KEEP_UPLOADS") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "REQGEN_KEEP_UPLOADS",
                reason: format!("'{}' is not a boolean", raw),
            })?,
            None => false,
        };

        Ok(Self {
            llm,
            bind_addr,
            upload_dir: get("REQGEN_UPLOAD_DIR")
                .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string())
                .into(),
            output_dir: get("REQGEN_OUTPUT_DIR")
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string())
                .into(),
            artifact_layout,
            max_upload_bytes: parse_var::<usize>(&get, "REQGEN_MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            keep_uploads,
        })
    }
}

/// Load `.env` from the current directory, falling back to the parent directory
pub fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path("../.env");
    }
}

fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: format!("'{}': {}", raw, e),
            })
        })
        .transpose()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
