//! Turns a question plus pending images into a model answer

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use super::accumulator::{ImageAccumulator, PendingImage};
use super::uploads::UploadStore;
use crate::gemini::{GenerativeModel, InlineImage, ModelError, Prompt};

/// What happens to pending images when the model call fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Leave them pending so the next question retries with them
    #[default]
    Keep,
    /// Drop them along with the failed turn
    Discard,
}

/// Lifecycle of pending images
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImagePolicy {
    pub on_failure: FailurePolicy,
    /// Delete files once their images leave the accumulator
    pub delete_consumed: bool,
    /// Age after which unconsumed uploads are swept; `None` disables sweeping
    pub ttl_secs: Option<u64>,
    pub sweep_interval_secs: u64,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            on_failure: FailurePolicy::Keep,
            delete_consumed: true,
            ttl_secs: Some(24 * 60 * 60),
            sweep_interval_secs: 60 * 60,
        }
    }
}

/// A pending image that could not be attached
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unrecognised image format: {}", path.display())]
    Format { path: PathBuf },
}

/// Failures that end in the fallback reply
#[derive(Debug, Error)]
enum TurnError {
    #[error(transparent)]
    Image(#[from] ImageLoadError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Answers text questions, attaching and consuming pending images
pub struct Responder {
    model: Arc<dyn GenerativeModel>,
    accumulator: Arc<ImageAccumulator>,
    uploads: UploadStore,
    policy: ImagePolicy,
    fallback: String,
}

impl Responder {
    #[must_use]
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        accumulator: Arc<ImageAccumulator>,
        uploads: UploadStore,
        policy: ImagePolicy,
        fallback: String,
    ) -> Self {
        Self {
            model,
            accumulator,
            uploads,
            policy,
            fallback,
        }
    }

    /// Answer `user_input` for the conversation behind `key`
    ///
    /// Pending images for `key` are appended after the text in arrival order.
    /// They are consumed when the model answers; on failure the configured
    /// `FailurePolicy` decides. Provider and image errors never escape: the
    /// caller always gets text to send back.
    pub async fn respond(&self, key: &str, user_input: &str) -> String {
        let pending = self.accumulator.snapshot(key);

        match self.generate(user_input, &pending).await {
            Ok(answer) => {
                if !pending.is_empty() {
                    self.consume(key, &pending).await;
                }
                tracing::info!(
                    key,
                    question = %user_input,
                    images = pending.len(),
                    answer_len = answer.len(),
                    "model answered"
                );
                tracing::debug!(answer = %answer, "model answer");
                answer
            }
            Err(e) => {
                tracing::error!(key, images = pending.len(), error = %e, "model turn failed");
                if self.policy.on_failure == FailurePolicy::Discard && !pending.is_empty() {
                    self.consume(key, &pending).await;
                }
                self.fallback.clone()
            }
        }
    }

    async fn generate(&self, user_input: &str, pending: &[PendingImage]) -> Result<String, TurnError> {
        let prompt = if pending.is_empty() {
            Prompt::text(user_input)
        } else {
            Prompt::with_images(user_input, load_images(pending).await?)
        };

        Ok(self.model.generate(&prompt).await?)
    }

    async fn consume(&self, key: &str, pending: &[PendingImage]) {
        let removed = self.accumulator.remove(key, pending);
        tracing::debug!(key, count = removed.len(), "pending images consumed");

        if self.policy.delete_consumed {
            for image in &removed {
                self.uploads.remove(&image.path).await;
            }
        }
    }
}

/// Read pending images from disk, preserving order
async fn load_images(pending: &[PendingImage]) -> Result<Vec<InlineImage>, ImageLoadError> {
    let mut images = Vec::with_capacity(pending.len());
    for image in pending {
        images.push(load_image(&image.path).await?);
    }
    Ok(images)
}

async fn load_image(path: &Path) -> Result<InlineImage, ImageLoadError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|source| ImageLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let mime_type = sniff_image_mime(&data).ok_or_else(|| ImageLoadError::Format {
        path: path.to_path_buf(),
    })?;

    Ok(InlineImage { mime_type, data })
}

/// Detect the image encoding from its magic bytes
///
/// Stored files always end in `.jpg`, so the extension says nothing.
#[must_use]
pub fn sniff_image_mime(data: &[u8]) -> Option<&'static str> {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}
