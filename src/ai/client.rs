use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use super::http_client::llm_client;
use super::prompts::{build_requirements_prompt, DEFAULT_MAX_PROMPT_CHARS};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

/// Generative-language providers the client can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    #[default]
    Gemini,
    OpenAi,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::OpenAi => "gpt-4",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => GEMINI_BASE_URL,
            Self::OpenAi => OPENAI_BASE_URL,
        }
    }

    /// JSON pointer to the reply text in a successful response
    fn reply_pointer(&self) -> &'static str {
        match self {
            Self::Gemini => "/candidates/0/content/parts/0/text",
            Self::OpenAi => "/choices/0/message/content",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "open-ai" => Ok(Self::OpenAi),
            other => Err(format!(
                "unknown provider '{}' (expected 'gemini' or 'openai')",
                other
            )),
        }
    }
}

/// Connection settings for one provider
#[derive(Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub max_prompt_chars: usize,
}

impl LlmSettings {
    /// Settings with the provider's default model and endpoint
    pub fn new(provider: LlmProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            timeout: None,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_prompt_chars(mut self, max_prompt_chars: usize) -> Self {
        self.max_prompt_chars = max_prompt_chars;
        self
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),
}

/// Transport errors drop the request URL so endpoint details never reach logs or clients
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.without_url())
    }
}

/// Turns document text into a raw categorized reply
#[async_trait]
pub trait RequirementExtractor: Send + Sync {
    async fn extract_requirements(&self, text: &str) -> Result<String, ApiError>;
}

/// Gemini request body
#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

/// OpenAI chat completion request body
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Error object both providers return on failure
#[derive(Deserialize)]
struct ProviderError {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

/// Requirements client for Gemini or OpenAI
pub struct RequirementsClient {
    client: Client,
    settings: LlmSettings,
}

impl RequirementsClient {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            client: llm_client().clone(),
            settings,
        }
    }

    /// Send one prompt and return the reply text
    pub async fn send_prompt(&self, prompt: &str) -> Result<String, ApiError> {
        let base = self.settings.base_url.trim_end_matches('/');

        let mut request = match self.settings.provider {
            LlmProvider::Gemini => self
                .client
                .post(format!(
                    "{}/v1beta/models/{}:generateContent",
                    base, self.settings.model
                ))
                .header(GEMINI_KEY_HEADER, &self.settings.api_key)
                .json(&GeminiRequest {
                    contents: vec![GeminiContent {
                        parts: vec![GeminiPart { text: prompt }],
                    }],
                }),
            LlmProvider::OpenAi => self
                .client
                .post(format!("{}/v1/chat/completions", base))
                .bearer_auth(&self.settings.api_key)
                .json(&ChatRequest {
                    model: &self.settings.model,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                }),
        };

        if let Some(timeout) = self.settings.timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!(
            "[RequirementsClient] Sending {} chars to {} ({})",
            prompt.len(),
            self.settings.provider,
            self.settings.model
        );

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                "[RequirementsClient] {} returned {}",
                self.settings.provider,
                status
            );
            return Err(status_error(status.as_u16(), &body));
        }

        let text = parse_reply(self.settings.provider, &body)?;

        tracing::info!(
            "[RequirementsClient] {} reply: {} chars",
            self.settings.provider,
            text.len()
        );

        Ok(text)
    }
}

#[async_trait]
impl RequirementExtractor for RequirementsClient {
    async fn extract_requirements(&self, text: &str) -> Result<String, ApiError> {
        let prompt = build_requirements_prompt(text, self.settings.max_prompt_chars);
        self.send_prompt(&prompt).await
    }
}

/// Non-2xx reply, using the provider's error message when the body carries one
fn status_error(status: u16, body: &str) -> ApiError {
    let body = match serde_json::from_str::<ProviderError>(body) {
        Ok(provider_error) => provider_error.error.message,
        Err(_) => body.to_string(),
    };
    ApiError::Status { status, body }
}

/// Pull the reply text out of a successful response body
fn parse_reply(provider: LlmProvider, body: &str) -> Result<String, ApiError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ApiError::MalformedResponse(format!("body is not JSON: {}", e)))?;

    value
        .pointer(provider.reply_pointer())
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::MalformedResponse(format!(
                "no reply text at {}",
                provider.reply_pointer()
            ))
        })
}
