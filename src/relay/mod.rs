//! Event routing between LINE and the model
//!
//! ```text
//! image event ──► fetch content ──► UploadStore ──► ImageAccumulator ──► ack reply
//! text event  ──► Responder (text + pending images) ──► model ──► answer reply
//! ```

pub mod accumulator;
pub mod responder;
pub mod uploads;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

pub use accumulator::{AccumulatorScope, GLOBAL_KEY, ImageAccumulator, PendingImage};
pub use responder::{FailurePolicy, ImageLoadError, ImagePolicy, Responder, sniff_image_mime};
pub use uploads::UploadStore;

use crate::Result;
use crate::gemini::GenerativeModel;
use crate::line::{EventSource, Message, MessageContent, MessagingApi, WebhookEvent};

/// Reply sent when the model call fails
pub const DEFAULT_FALLBACK_REPLY: &str = "維修中~";

/// Acknowledgment after an image upload; `{count}` is the pending total
pub const DEFAULT_ACK_TEMPLATE: &str =
    "上傳完成，目前已上傳 {count} 張圖片。請問你想問關於這些圖片的什麼問題？";

/// Relay behaviour settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelayOptions {
    pub upload_dir: PathBuf,
    pub scope: AccumulatorScope,
    pub images: ImagePolicy,
    pub fallback_reply: String,
    pub ack_template: String,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("static"),
            scope: AccumulatorScope::default(),
            images: ImagePolicy::default(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            ack_template: DEFAULT_ACK_TEMPLATE.to_string(),
        }
    }
}

/// Per-event reply addressing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    pub reply_token: String,
    /// Accumulator key of the event's conversation
    pub key: String,
}

/// Routes verified webhook events to the text and image handlers
pub struct Relay {
    messaging: Arc<dyn MessagingApi>,
    responder: Responder,
    accumulator: Arc<ImageAccumulator>,
    uploads: UploadStore,
    images: ImagePolicy,
    ack_template: String,
}

impl Relay {
    /// Build a relay, creating the upload directory if needed
    ///
    /// # Errors
    ///
    /// Returns error if the upload directory cannot be created
    pub fn new(
        messaging: Arc<dyn MessagingApi>,
        model: Arc<dyn GenerativeModel>,
        options: RelayOptions,
    ) -> Result<Self> {
        let uploads = UploadStore::open(&options.upload_dir)?;
        let accumulator = Arc::new(ImageAccumulator::new(options.scope));
        let responder = Responder::new(
            model,
            accumulator.clone(),
            uploads.clone(),
            options.images.clone(),
            options.fallback_reply,
        );

        Ok(Self {
            messaging,
            responder,
            accumulator,
            uploads,
            images: options.images,
            ack_template: options.ack_template,
        })
    }

    #[must_use]
    pub fn accumulator(&self) -> &ImageAccumulator {
        &self.accumulator
    }

    #[must_use]
    pub const fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Route one webhook event
    ///
    /// Non-message events, unsupported message types, and events without a
    /// reply token are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the reply or content download fails
    pub async fn dispatch(&self, event: &WebhookEvent) -> Result<()> {
        let WebhookEvent::Message(message) = event else {
            tracing::debug!("ignoring non-message event");
            return Ok(());
        };

        let Some(reply_token) = message.reply_token.clone() else {
            tracing::debug!("ignoring message event without reply token");
            return Ok(());
        };

        let conversation = message.source.as_ref().and_then(EventSource::conversation_id);
        let ctx = ReplyContext {
            reply_token,
            key: self.accumulator.key_for(conversation),
        };

        match &message.message {
            MessageContent::Text(text) => self.handle_text_event(&ctx, &text.text).await,
            MessageContent::Image(image) => self.handle_image_event(&ctx, &image.id).await,
            MessageContent::Unsupported => {
                tracing::debug!(key = %ctx.key, "ignoring unsupported message type");
                Ok(())
            }
        }
    }

    /// Answer a text message, attaching any pending images
    ///
    /// # Errors
    ///
    /// Returns error if the reply cannot be delivered
    pub async fn handle_text_event(&self, ctx: &ReplyContext, text: &str) -> Result<()> {
        tracing::debug!(key = %ctx.key, "handling text message");
        let answer = self.responder.respond(&ctx.key, text).await;
        self.messaging
            .reply_message(&ctx.reply_token, &[Message::text(answer)])
            .await
    }

    /// Store an uploaded image and acknowledge it with the pending count
    ///
    /// # Errors
    ///
    /// Returns error if the content download, file write, or reply fails
    pub async fn handle_image_event(&self, ctx: &ReplyContext, message_id: &str) -> Result<()> {
        let content = self.messaging.get_message_content(message_id).await?;
        let path = self.uploads.save(content).await?;

        let count = self
            .accumulator
            .push(&ctx.key, PendingImage::new(path.clone(), message_id));
        tracing::info!(key = %ctx.key, message_id, path = %path.display(), count, "image queued");

        let ack = self.ack_template.replace("{count}", &count.to_string());
        self.messaging
            .reply_message(&ctx.reply_token, &[Message::text(ack)])
            .await
    }

    /// Expire pending images and stored files older than `ttl`
    ///
    /// # Errors
    ///
    /// Returns error if the upload directory cannot be listed
    pub async fn sweep_expired(&self, ttl: Duration) -> Result<usize> {
        let cutoff = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| chrono::Utc::now().checked_sub_signed(ttl))
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
        let expired = self.accumulator.expire(cutoff);
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired pending images");
        }

        self.uploads.sweep(ttl).await
    }

    /// Spawn the periodic upload sweep if a TTL is configured
    #[must_use]
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        let ttl = Duration::from_secs(self.images.ttl_secs?);
        let interval = Duration::from_secs(self.images.sweep_interval_secs.max(1));
        let relay = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match relay.sweep_expired(ttl).await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "swept stale uploads"),
                    Err(e) => tracing::warn!(error = %e, "upload sweep failed"),
                }
            }
        }))
    }
}
