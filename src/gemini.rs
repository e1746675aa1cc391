//! Google Gemini backend for [`GenerativeModel`].
//!
//! Calls `POST {base_url}/models/{model}:generateContent` with a single user
//! turn whose parts mirror the orchestrator's [`ContentPart`] slice one to
//! one, so part order on the wire is exactly the order the caller built.
//! Authentication uses the `x-goog-api-key` header.

use crate::config::InferenceConfig;
use crate::error::{AtsError, InferenceError};
use crate::provider::{ContentPart, GenerativeModel, Generation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("resume-ats/", env!("CARGO_PKG_VERSION"));

/// Finish reasons that mean the service withheld the answer.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason", default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────────

/// HTTP client bound to one model and one API key.
pub struct GeminiClient {
    http: reqwest::Client,
    config: InferenceConfig,
    endpoint: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl GeminiClient {
    /// Build a client from an already validated configuration.
    pub fn new(config: InferenceConfig) -> Result<Self, AtsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AtsError::Internal(format!("failed to build HTTP client: {e}")))?;

        let endpoint = model_endpoint(&config.base_url, &config.model, "generateContent");
        Ok(Self {
            http,
            config,
            endpoint,
        })
    }

    /// Full URL of the generate call.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, parts: &[ContentPart<'_>]) -> Result<Generation, InferenceError> {
        let request = build_request(&self.config, parts);
        debug!("POST {} ({} parts)", self.endpoint, parts.len());

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            let detail = api_error_message(&body);
            warn!("Gemini returned HTTP {}: {}", status.as_u16(), detail);
            return Err(match status.as_u16() {
                401 | 403 => InferenceError::Auth {
                    status: status.as_u16(),
                    detail,
                },
                code => InferenceError::Api {
                    status: code,
                    detail,
                },
            });
        }

        parse_response(&body)
    }
}

impl GeminiClient {
    fn map_transport_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout {
                secs: self.config.api_timeout_secs,
            }
        } else {
            InferenceError::Transport {
                detail: e.to_string(),
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Prefix bare model names with `models/`.
pub fn sanitize_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

fn model_endpoint(base_url: &str, model: &str, action: &str) -> String {
    format!(
        "{}/{}:{}",
        base_url.trim_end_matches('/'),
        sanitize_model(model),
        action
    )
}

pub(crate) fn build_request<'a>(
    config: &InferenceConfig,
    parts: &[ContentPart<'a>],
) -> GenerateContentRequest<'a> {
    let parts = parts
        .iter()
        .map(|part| match *part {
            ContentPart::Text(text) => Part {
                text: Some(text),
                inline_data: None,
            },
            ContentPart::InlineImage(image) => Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: &image.mime_type,
                    data: &image.data,
                }),
            },
        })
        .collect();

    let generation_config = if config.temperature.is_some() || config.max_output_tokens.is_some() {
        Some(GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    } else {
        None
    };

    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts,
        }],
        generation_config,
    }
}

/// Pull the text of the first candidate out of a response body.
pub(crate) fn parse_response(body: &str) -> Result<Generation, InferenceError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::MalformedResponse {
            detail: format!("invalid JSON: {e}"),
        })?;

    let usage = response.usage_metadata.as_ref();
    let prompt_tokens = usage.and_then(|u| u.prompt_token_count);
    let output_tokens = usage.and_then(|u| u.candidates_token_count);

    let Some(candidate) = response.candidates.first() else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(InferenceError::Blocked { reason });
        }
        return Err(InferenceError::MalformedResponse {
            detail: "response has no candidates".into(),
        });
    };

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason.as_deref() {
            if BLOCKING_FINISH_REASONS.contains(&reason) {
                return Err(InferenceError::Blocked {
                    reason: reason.to_string(),
                });
            }
        }
        return Err(InferenceError::MalformedResponse {
            detail: "first candidate contains no text".into(),
        });
    }

    Ok(Generation {
        text,
        prompt_tokens,
        output_tokens,
    })
}

fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(ApiErrorResponse {
            error: Some(detail),
        }) => match (detail.status, detail.message) {
            (Some(status), Some(message)) => format!("{status}: {message}"),
            (None, Some(message)) => message,
            (Some(status), None) => status,
            (None, None) => body.to_string(),
        },
        _ => body.chars().take(500).collect(),
    }
}
