/// Gemini client: the single point of entry for all hosted-model calls.
///
/// No other module may talk to the Generative Language API directly.
/// Model: models/gemini-flash-latest (hardcoded, free-tier friendly)
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::converter::PageImage;

/// The model used for every analysis.
pub const MODEL: &str = "models/gemini-flash-latest";
/// Sampling temperature sent with every request. No token limits are set.
pub const TEMPERATURE: f32 = 0.2;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const QUOTA_STATUS: &str = "RESOURCE_EXHAUSTED";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned no text content")]
    EmptyContent,
}

impl ModelError {
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, ModelError::QuotaExhausted(_))
    }
}

/// A hosted multimodal model that answers an instruction about a page image
/// and a job description with text.
///
/// Carried in `Analyzer` as `Arc<dyn GenerativeModel>` so tests can swap it.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(
        &self,
        instruction: &str,
        image: &PageImage,
        job_description: &str,
    ) -> Result<String, ModelError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if parts.iter().all(|p| p.text.is_none()) {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Wraps the `generateContent` endpoint. One request per call, no retries.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_base: impl Into<String>, api_key: String) -> Result<Self, ModelError> {
        Ok(Self {
            client: Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?,
            api_base: api_base.into(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            MODEL
        )
    }

    /// Sends the three-part payload and returns the decoded response.
    pub async fn generate_content(
        &self,
        instruction: &str,
        image: &PageImage,
        job_description: &str,
    ) -> Result<GenerateContentResponse, ModelError> {
        let request_body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: instruction },
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        },
                    },
                    Part::Text {
                        text: job_description,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, body));
        }

        let body: GenerateContentResponse = response.json().await?;
        if let Some(usage) = &body.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={:?}, candidate_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }
        Ok(body)
    }
}

fn classify_failure(status: StatusCode, body: String) -> ModelError {
    let parsed = serde_json::from_str::<GoogleError>(&body).ok();
    let is_quota = status == StatusCode::TOO_MANY_REQUESTS
        || parsed.as_ref().is_some_and(|e| e.error.status == QUOTA_STATUS);
    let message = parsed.map(|e| e.error.message).unwrap_or(body);

    if is_quota {
        warn!("Gemini quota exhausted ({status}): {message}");
        ModelError::QuotaExhausted(message)
    } else {
        ModelError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(
        &self,
        instruction: &str,
        image: &PageImage,
        job_description: &str,
    ) -> Result<String, ModelError> {
        let response = self
            .generate_content(instruction, image, job_description)
            .await?;
        response.text().ok_or_else(|| {
            let reason = response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            warn!("Gemini returned no text (finish reason: {reason})");
            ModelError::EmptyContent
        })
    }
}
