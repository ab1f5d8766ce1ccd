//! Configuration management for the relay
//!
//! Values resolve as env > TOML file > default. The LINE channel secret, the
//! channel access token, and the Gemini API key have no default; loading fails
//! without them.

pub mod file;

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use crate::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GenerationConfig, SafetySettings};
use crate::line::{DEFAULT_API_BASE, DEFAULT_DATA_API_BASE};
use crate::relay::RelayOptions;
use crate::{Error, Result};

pub use file::RelayConfigFile;

/// Persona instruction injected into every model call
pub const DEFAULT_PERSONA: &str = "你是皮卡丘\n使用繁體中文來回答問題。";

/// Port used when neither env nor file sets one
pub const DEFAULT_PORT: u16 = 5000;

/// Relay configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub line: LineConfig,
    pub gemini: GeminiConfig,
    pub server: ServerConfig,
    pub relay: RelayOptions,
}

/// LINE channel configuration
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Key for webhook signature verification (`LINE_CHANNEL_SECRET`)
    pub channel_secret: SecretString,

    /// Bearer token for the Messaging API (`LINE_CHANNEL_ACCESS_TOKEN`)
    pub channel_access_token: SecretString,

    pub api_base: String,
    pub data_api_base: String,
    pub timeout: Duration,
}

/// Gemini model configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key (`GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`)
    pub api_key: SecretString,

    /// Model identifier (`RELAY_MODEL`)
    pub model: String,

    pub base_url: String,

    /// Persona text (`RELAY_PERSONA`)
    pub system_instruction: String,

    pub generation: GenerationConfig,
    pub safety: SafetySettings,
    pub timeout: Duration,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,

    /// Port to listen on (`RELAY_PORT`, then `PORT`)
    pub port: u16,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a required credential is missing or a value is invalid
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path);
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an env lookup
    ///
    /// # Errors
    ///
    /// Returns error if a required credential is missing or a value is invalid
    pub fn from_sources<F>(fc: RelayConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_nonempty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let channel_secret = env_nonempty("LINE_CHANNEL_SECRET")
            .or(fc.line.channel_secret)
            .ok_or_else(|| {
                Error::Config(
                    "LINE channel secret not set (LINE_CHANNEL_SECRET or [line].channel_secret)"
                        .to_string(),
                )
            })?;

        let channel_access_token = env_nonempty("LINE_CHANNEL_ACCESS_TOKEN")
            .or(fc.line.channel_access_token)
            .ok_or_else(|| {
                Error::Config(
                    "LINE channel access token not set (LINE_CHANNEL_ACCESS_TOKEN or [line].channel_access_token)"
                        .to_string(),
                )
            })?;

        let api_key = env_nonempty("GEMINI_API_KEY")
            .or_else(|| env_nonempty("GOOGLE_API_KEY"))
            .or(fc.gemini.api_key)
            .ok_or_else(|| {
                Error::Config("Gemini API key not set (GEMINI_API_KEY or [gemini].api_key)".to_string())
            })?;

        let port = match env_nonempty("RELAY_PORT").or_else(|| env_nonempty("PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid port {raw:?}: {e}")))?,
            None => fc.server.port.unwrap_or(DEFAULT_PORT),
        };

        let mut relay = fc.relay;
        if let Some(dir) = env_nonempty("RELAY_UPLOAD_DIR") {
            relay.upload_dir = dir.into();
        }

        Ok(Self {
            line: LineConfig {
                channel_secret: SecretString::from(channel_secret),
                channel_access_token: SecretString::from(channel_access_token),
                api_base: fc
                    .line
                    .api_base
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                data_api_base: fc
                    .line
                    .data_api_base
                    .unwrap_or_else(|| DEFAULT_DATA_API_BASE.to_string()),
                timeout: Duration::from_secs(fc.line.timeout_secs.unwrap_or(30)),
            },
            gemini: GeminiConfig {
                api_key: SecretString::from(api_key),
                model: env_nonempty("RELAY_MODEL")
                    .or(fc.gemini.model)
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: fc
                    .gemini
                    .base_url
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                system_instruction: env("RELAY_PERSONA")
                    .or(fc.gemini.system_instruction)
                    .unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
                generation: fc.gemini.generation.unwrap_or_default(),
                safety: fc.gemini.safety,
                timeout: Duration::from_secs(fc.gemini.timeout_secs.unwrap_or(120)),
            },
            server: ServerConfig {
                host: fc.server.host.unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
            },
            relay,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("LINE_CHANNEL_SECRET", "secret"),
        ("LINE_CHANNEL_ACCESS_TOKEN", "token"),
        ("GEMINI_API_KEY", "gkey"),
    ];

    #[test]
    fn defaults_with_required_env() {
        let config = Config::from_sources(RelayConfigFile::default(), env_of(&REQUIRED)).unwrap();

        assert_eq!(config.line.channel_secret.expose_secret(), "secret");
        assert_eq!(config.gemini.model, DEFAULT_MODEL);
        assert_eq!(config.gemini.system_instruction, DEFAULT_PERSONA);
        assert_eq!(config.gemini.generation, GenerationConfig::default());
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.relay, RelayOptions::default());
    }

    #[test]
    fn missing_channel_secret_is_fatal() {
        let err = Config::from_sources(
            RelayConfigFile::default(),
            env_of(&[("LINE_CHANNEL_ACCESS_TOKEN", "t"), ("GEMINI_API_KEY", "k")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("LINE_CHANNEL_SECRET")));
    }

    #[test]
    fn missing_access_token_is_fatal() {
        let err = Config::from_sources(
            RelayConfigFile::default(),
            env_of(&[("LINE_CHANNEL_SECRET", "s"), ("GEMINI_API_KEY", "k")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("LINE_CHANNEL_ACCESS_TOKEN")));
    }

    #[test]
    fn blank_env_value_counts_as_missing() {
        let err = Config::from_sources(
            RelayConfigFile::default(),
            env_of(&[
                ("LINE_CHANNEL_SECRET", "s"),
                ("LINE_CHANNEL_ACCESS_TOKEN", "t"),
                ("GEMINI_API_KEY", "  "),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_file() {
        let fc = file::parse_config(
            r#"
[line]
channel_secret = "file-secret"
channel_access_token = "file-token"

[gemini]
api_key = "file-key"
model = "file-model"

[server]
port = 7000
"#,
        )
        .unwrap();

        let config = Config::from_sources(
            fc,
            env_of(&[
                ("LINE_CHANNEL_SECRET", "env-secret"),
                ("RELAY_MODEL", "env-model"),
                ("PORT", "9000"),
                ("RELAY_UPLOAD_DIR", "/tmp/uploads"),
            ]),
        )
        .unwrap();

        assert_eq!(config.line.channel_secret.expose_secret(), "env-secret");
        assert_eq!(config.line.channel_access_token.expose_secret(), "file-token");
        assert_eq!(config.gemini.api_key.expose_secret(), "file-key");
        assert_eq!(config.gemini.model, "env-model");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.relay.upload_dir, std::path::PathBuf::from("/tmp/uploads"));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RELAY_PORT", "http"));
        let err = Config::from_sources(RelayConfigFile::default(), env_of(&pairs)).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("invalid port")));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = Config::from_sources(RelayConfigFile::default(), env_of(&REQUIRED)).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("gkey"));
        assert!(!rendered.contains("\"token\""));
    }
}
