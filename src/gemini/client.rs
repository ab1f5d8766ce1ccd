//! REST client for `models/{model}:generateContent`

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{GenerationConfig, GenerativeModel, ModelError, Prompt, SafetySetting, SafetySettings};
use crate::Result;

/// Public Gemini API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Gemini API client with fixed generation and safety options
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    system_instruction: Option<String>,
    generation: GenerationConfig,
    safety: SafetySettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: &'a GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

/// Content part: plain text or base64 inline data
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    InlineData(Blob<'a>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GeminiClient {
    /// Create a client for the given model
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(api_key: SecretString, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: model.into(),
            system_instruction: None,
            generation: GenerationConfig::default(),
            safety: SafetySettings::default(),
        })
    }

    /// Override the API base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the persona instruction sent with every call
    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        self.system_instruction = (!instruction.trim().is_empty()).then_some(instruction);
        self
    }

    /// Set sampling parameters
    #[must_use]
    pub const fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Set harm category thresholds
    #[must_use]
    pub const fn with_safety_settings(mut self, safety: SafetySettings) -> Self {
        self.safety = safety;
        self
    }

    /// Configured model identifier
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{base}/v1beta/models/{model}:generateContent")
    }

    fn build_request<'a>(&'a self, prompt: &'a Prompt) -> GenerateContentRequest<'a> {
        let engine = base64::engine::general_purpose::STANDARD;

        let mut parts = Vec::with_capacity(prompt.images.len() + 1);
        parts.push(Part::Text(&prompt.text));
        parts.extend(prompt.images.iter().map(|image| {
            Part::InlineData(Blob {
                mime_type: image.mime_type,
                data: engine.encode(&image.data),
            })
        }));

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            system_instruction: self.system_instruction.as_deref().map(|text| Content {
                role: None,
                parts: vec![Part::Text(text)],
            }),
            generation_config: &self.generation,
            safety_settings: self.safety.to_settings(),
        }
    }
}

/// Pull the answer text out of a decoded response
fn extract_text(response: GenerateContentResponse) -> std::result::Result<String, ModelError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(ModelError::Blocked(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(text);
    }

    match candidate.finish_reason.as_deref() {
        Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
            Err(ModelError::Blocked(reason.to_string()))
        }
        _ => Err(ModelError::Empty),
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> std::result::Result<String, ModelError> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map_or(body, |e| e.error.message);
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let decoded: GenerateContentResponse = response.json().await?;
        extract_text(decoded)
    }
}
