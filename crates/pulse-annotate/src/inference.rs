//! Language-model seam and the Gemini `generateContent` client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pulse_core::AppConfig;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Opaque prompt-in, text-out model call.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Send one prompt and return the model's reply text unmodified.
    ///
    /// # Errors
    ///
    /// Any transport failure, non-2xx status or reply without text.
    async fn infer(&self, prompt: &str) -> Result<String, InferenceError>;

    /// Backend name for logs.
    fn provider_name(&self) -> &'static str;
}

pub type DynInferenceClient = Arc<dyn InferenceClient>;

/// Stand-in used when no model credentials are configured; every call fails
/// with [`InferenceError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledInference;

#[async_trait]
impl InferenceClient for DisabledInference {
    async fn infer(&self, _prompt: &str) -> Result<String, InferenceError> {
        Err(InferenceError::NotConfigured)
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Build the inference client described by `config`, or
/// [`DisabledInference`] when `GEMINI_API_KEY` is unset.
///
/// # Errors
///
/// Returns [`InferenceError`] if the HTTP client cannot be constructed or the
/// configured base URL is invalid.
pub fn inference_from_config(config: &AppConfig) -> Result<DynInferenceClient, InferenceError> {
    let Some(api_key) = config.gemini_api_key.as_deref() else {
        tracing::info!("GEMINI_API_KEY not set; annotation disabled");
        return Ok(Arc::new(DisabledInference));
    };
    let client = GeminiClient::with_base_url(
        api_key,
        &config.gemini_model,
        config.inference_timeout_secs,
        config.gemini_base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
    )?;
    Ok(Arc::new(client))
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: Url,
}

impl GeminiClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::Http`] if the `reqwest::Client` cannot be
    /// built.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, InferenceError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`InferenceError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("topicpulse/0.1 (annotation)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| InferenceError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            base_url,
        })
    }

    fn generate_url(&self) -> Result<Url, InferenceError> {
        self
            .base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(|e| InferenceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn infer(&self, prompt: &str) -> Result<String, InferenceError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.generate_url()?)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: GenerateResponse =
            serde_json::from_str(&text).map_err(InferenceError::Deserialize)?;
        envelope.into_text().ok_or(InferenceError::EmptyResponse)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
