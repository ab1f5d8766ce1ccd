//! LINE Messaging API integration
//!
//! Webhook types, signature verification, and the outbound client used for
//! replies and content downloads.

mod client;
pub mod signature;
pub mod types;

pub use client::{DEFAULT_API_BASE, DEFAULT_DATA_API_BASE, LineClient, MessagingApi};
pub use types::{
    EventSource, ImageMessage, Message, MessageContent, MessageEvent, TextMessage, WebhookBody,
    WebhookEvent,
};
