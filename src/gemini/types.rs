//! Typed generation and safety options for `generateContent`

use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every generation call
///
/// Deserialized from `snake_case` TOML, serialized in the API's `camelCase`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
        }
    }
}

/// Harm categories the relay configures thresholds for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

/// Blocking threshold for a harm category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    #[default]
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

/// One `safetySettings` entry on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Thresholds for the four fixed harm categories
///
/// Every field defaults to `BLOCK_NONE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SafetySettings {
    pub harassment: HarmBlockThreshold,
    pub hate_speech: HarmBlockThreshold,
    pub sexually_explicit: HarmBlockThreshold,
    pub dangerous_content: HarmBlockThreshold,
}

impl SafetySettings {
    /// Expand into the list form the API expects
    #[must_use]
    pub fn to_settings(&self) -> Vec<SafetySetting> {
        vec![
            SafetySetting {
                category: HarmCategory::Harassment,
                threshold: self.harassment,
            },
            SafetySetting {
                category: HarmCategory::HateSpeech,
                threshold: self.hate_speech,
            },
            SafetySetting {
                category: HarmCategory::SexuallyExplicit,
                threshold: self.sexually_explicit,
            },
            SafetySetting {
                category: HarmCategory::DangerousContent,
                threshold: self.dangerous_content,
            },
        ]
    }
}
