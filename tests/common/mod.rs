//! Shared test utilities

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use line_relay::gemini::{GenerativeModel, ModelError, Prompt};
use line_relay::line::{Message, MessagingApi};
use line_relay::relay::{Relay, RelayOptions};
use tempfile::TempDir;

/// Smallest byte strings the relay recognises as images
pub const JPEG_A: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, b'A'];
pub const JPEG_B: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, b'B'];
pub const PNG_C: &[u8] = b"\x89PNG\r\n\x1a\nC";

pub const SECRET: &str = "test-channel-secret";
pub const FALLBACK: &str = "service unavailable";

/// Scripted model outcome
#[derive(Debug, Clone)]
pub enum Outcome {
    Answer(String),
    Fail(u16),
}

/// Model that records prompts and replays scripted outcomes
#[derive(Default)]
pub struct MockModel {
    prompts: Mutex<Vec<Prompt>>,
    script: Mutex<VecDeque<Outcome>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next call; unscripted calls answer "mock answer"
    pub fn then(&self, outcome: Outcome) -> &Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Outcome::Answer(text)) => Ok(text),
            Some(Outcome::Fail(status)) => Err(ModelError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            None => Ok("mock answer".to_string()),
        }
    }
}

/// Messaging platform that records replies and serves canned content
#[derive(Default)]
pub struct MockMessaging {
    replies: Mutex<Vec<(String, Vec<Message>)>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    fail_replies: AtomicBool,
}

impl MockMessaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(&self, message_id: &str, bytes: &[u8]) -> &Self {
        self.contents
            .lock()
            .unwrap()
            .insert(message_id.to_string(), bytes.to_vec());
        self
    }

    pub fn fail_replies(&self, fail: bool) {
        self.fail_replies.store(fail, Ordering::SeqCst);
    }

    pub fn replies(&self) -> Vec<(String, Vec<Message>)> {
        self.replies.lock().unwrap().clone()
    }

    /// Text of every reply, in send order
    pub fn reply_texts(&self) -> Vec<String> {
        self.replies()
            .into_iter()
            .flat_map(|(_, messages)| messages)
            .map(|Message::Text { text }| text)
            .collect()
    }
}

#[async_trait]
impl MessagingApi for MockMessaging {
    async fn reply_message(&self, reply_token: &str, messages: &[Message]) -> line_relay::Result<()> {
        if self.fail_replies.load(Ordering::SeqCst) {
            return Err(line_relay::Error::Channel("reply rejected".to_string()));
        }
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), messages.to_vec()));
        Ok(())
    }

    async fn get_message_content(&self, message_id: &str) -> line_relay::Result<Vec<u8>> {
        self.contents
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .ok_or_else(|| line_relay::Error::Channel(format!("no content for {message_id}")))
    }
}

/// A relay wired to mocks, with its upload directory
pub struct Harness {
    pub relay: Arc<Relay>,
    pub messaging: Arc<MockMessaging>,
    pub model: Arc<MockModel>,
    pub uploads: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(|_| {})
    }

    pub fn with_options(customize: impl FnOnce(&mut RelayOptions)) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let mut options = RelayOptions {
            upload_dir: uploads.path().join("static"),
            fallback_reply: FALLBACK.to_string(),
            ..RelayOptions::default()
        };
        customize(&mut options);

        let messaging = Arc::new(MockMessaging::new());
        let model = Arc::new(MockModel::new());
        let relay = Arc::new(Relay::new(messaging.clone(), model.clone(), options).unwrap());

        Self {
            relay,
            messaging,
            model,
            uploads,
        }
    }

    /// Files currently in the upload directory
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.relay.uploads().dir())
            .unwrap()
            .count()
    }
}

/// Webhook event JSON for a text message from `user`
pub fn text_event(reply_token: &str, user: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "mode": "active",
        "timestamp": 1_700_000_000_000_i64,
        "replyToken": reply_token,
        "source": {"type": "user", "userId": user},
        "message": {"type": "text", "id": format!("t-{reply_token}"), "text": text}
    })
}

/// Webhook event JSON for an image message from `user`
pub fn image_event(reply_token: &str, user: &str, message_id: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "mode": "active",
        "timestamp": 1_700_000_000_000_i64,
        "replyToken": reply_token,
        "source": {"type": "user", "userId": user},
        "message": {"type": "image", "id": message_id, "contentProvider": {"type": "line"}}
    })
}

/// Parse one event JSON into the typed form
pub fn event(value: serde_json::Value) -> line_relay::line::WebhookEvent {
    serde_json::from_value(value).unwrap()
}
