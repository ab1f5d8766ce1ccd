//! LINE Relay - answers LINE chat messages with Gemini
//!
//! Users chat with a LINE bot. Images they send are stored and queued; the
//! next text message is sent to Gemini together with every queued image, and
//! the answer is replied back in the same conversation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              LINE Messaging API               │
//! └──────────┬──────────────────────▲────────────┘
//!            │ webhook              │ reply / content
//! ┌──────────▼──────────────────────┴────────────┐
//! │  api::webhooks::line  (signature check)       │
//! │  relay::Relay         (text / image routing)  │
//! │  relay::Responder     (pending images + text) │
//! └──────────┬───────────────────────────────────┘
//!            │ generateContent
//! ┌──────────▼───────────────────────────────────┐
//! │                    Gemini                     │
//! └──────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod gemini;
pub mod line;
pub mod relay;

pub use config::Config;
pub use error::{Error, Result};
pub use gemini::{GeminiClient, GenerativeModel, ModelError, Prompt};
pub use line::{LineClient, MessagingApi};
pub use relay::{Relay, RelayOptions};
