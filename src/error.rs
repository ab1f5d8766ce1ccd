//! Error types for the relay gateway

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the relay gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Webhook signature missing or invalid
    #[error("signature error: {0}")]
    Signature(String),

    /// Webhook body could not be decoded
    #[error("payload error: {0}")]
    Payload(String),

    /// Messaging platform call failed (reply, content fetch)
    #[error("channel error: {0}")]
    Channel(String),

    /// Upload directory error
    #[error("upload error: {0}")]
    Upload(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
