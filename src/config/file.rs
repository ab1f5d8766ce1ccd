//! TOML configuration file loading
//!
//! Supports `--config <path>` or `~/.config/line-relay/config.toml`.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::gemini::{GenerationConfig, SafetySettings};
use crate::relay::RelayOptions;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct RelayConfigFile {
    /// LINE channel credentials and endpoints
    #[serde(default)]
    pub line: LineFileConfig,

    /// Gemini model configuration
    #[serde(default)]
    pub gemini: GeminiFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Image accumulation and reply texts
    #[serde(default)]
    pub relay: RelayOptions,
}

#[derive(Debug, Default, Deserialize)]
pub struct LineFileConfig {
    pub channel_secret: Option<String>,
    pub channel_access_token: Option<String>,
    pub api_base: Option<String>,
    pub data_api_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GeminiFileConfig {
    pub api_key: Option<String>,
    /// Model identifier (e.g. "gemini-1.5-flash-latest")
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Persona text sent as the system instruction
    pub system_instruction: Option<String>,
    pub timeout_secs: Option<u64>,
    pub generation: Option<GenerationConfig>,
    #[serde(default)]
    pub safety: SafetySettings,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Load the TOML config file
///
/// Uses `explicit` when given, otherwise the standard path. Returns
/// `RelayConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(explicit: Option<&Path>) -> RelayConfigFile {
    let Some(path) = explicit.map(Path::to_path_buf).or_else(config_file_path) else {
        return RelayConfigFile::default();
    };

    if !path.exists() {
        if explicit.is_some() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
        }
        return RelayConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                RelayConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            RelayConfigFile::default()
        }
    }
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the TOML is malformed or has wrongly typed fields
pub fn parse_config(content: &str) -> crate::Result<RelayConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/line-relay/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("line-relay").join("config.toml"))
}
