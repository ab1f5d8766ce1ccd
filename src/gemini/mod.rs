//! Gemini generative model client
//!
//! The relay only needs one operation from the model: turn a text question,
//! optionally followed by images, into a text answer. `GenerativeModel` is
//! that seam; `GeminiClient` implements it against the REST API.

mod client;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient};
pub use types::{
    GenerationConfig, HarmBlockThreshold, HarmCategory, SafetySetting, SafetySettings,
};

/// Recoverable failures of a generation call
///
/// Every variant is something the provider or the network did to us.
/// The responder turns these into the fallback reply.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Request never completed (connect, timeout, body decode)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Prompt or answer withheld by safety filtering
    #[error("response blocked: {0}")]
    Blocked(String),

    /// Candidate carried no text
    #[error("empty response")]
    Empty,
}

/// An image attached to a prompt, already loaded into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

/// Ordered model input: the text first, then images in the order given
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub images: Vec<InlineImage>,
}

impl Prompt {
    /// Text-only prompt
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
        }
    }

    /// Prompt with images appended after the text
    #[must_use]
    pub fn with_images(text: impl Into<String>, images: Vec<InlineImage>) -> Self {
        Self {
            text: text.into(),
            images,
        }
    }
}

/// A model that answers prompts with text
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate an answer for the prompt
    ///
    /// # Errors
    ///
    /// Returns `ModelError` when the provider fails or withholds the answer
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError>;
}
