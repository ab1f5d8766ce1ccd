//! LINE webhook and Messaging API types

use serde::{Deserialize, Serialize};

/// Webhook request body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookBody {
    /// Bot user ID that received the events
    #[serde(default)]
    pub destination: String,
    pub events: Vec<WebhookEvent>,
}

/// Webhook event (simplified to what the relay routes on)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebhookEvent {
    Message(MessageEvent),
    /// follow, unfollow, postback, join, ...
    #[serde(other)]
    Unsupported,
}

/// A message event
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// Absent for events delivered in standby mode
    pub reply_token: Option<String>,
    pub source: Option<EventSource>,
    pub message: MessageContent,
    pub timestamp: Option<i64>,
    pub webhook_event_id: Option<String>,
}

/// Where an event came from
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    /// "user", "group" or "room"
    #[serde(rename = "type")]
    pub kind: String,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub room_id: Option<String>,
}

impl EventSource {
    /// Identifier of the conversation the event belongs to
    ///
    /// Group and room chats share one conversation across members.
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or(self.room_id.as_deref())
            .or(self.user_id.as_deref())
    }
}

/// Message content, tagged by `type`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text(TextMessage),
    Image(ImageMessage),
    /// sticker, video, audio, file, location
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TextMessage {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageMessage {
    pub id: String,
}

/// Outgoing message object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text { text: String },
}

impl Message {
    /// Plain text message
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Body of `POST /v2/bot/message/reply`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMessageRequest<'a> {
    pub reply_token: &'a str,
    pub messages: &'a [Message],
}
