//! Pending images awaiting a question
//!
//! Images are kept per accumulator key in arrival order. A text turn takes a
//! snapshot, and only the images in that snapshot are removed once the turn
//! finishes, so uploads that land while the model call is in flight wait for
//! the next question instead of being lost.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Key used when all conversations share one collection
pub const GLOBAL_KEY: &str = "*";

/// One uploaded image waiting to be attached to a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    /// Stored file in the upload directory
    pub path: PathBuf,
    /// LINE message the content came from
    pub message_id: String,
    pub received_at: DateTime<Utc>,
}

impl PendingImage {
    #[must_use]
    pub fn new(path: PathBuf, message_id: impl Into<String>) -> Self {
        Self {
            path,
            message_id: message_id.into(),
            received_at: Utc::now(),
        }
    }
}

/// How pending images are partitioned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccumulatorScope {
    /// One list shared by every sender
    Global,
    /// One list per group, room, or user chat
    #[default]
    Conversation,
}

/// Ordered pending-image store
#[derive(Debug, Default)]
pub struct ImageAccumulator {
    scope: AccumulatorScope,
    pending: Mutex<HashMap<String, Vec<PendingImage>>>,
}

impl ImageAccumulator {
    #[must_use]
    pub fn new(scope: AccumulatorScope) -> Self {
        Self {
            scope,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Accumulator key for an event's conversation
    #[must_use]
    pub fn key_for(&self, conversation_id: Option<&str>) -> String {
        match (self.scope, conversation_id) {
            (AccumulatorScope::Conversation, Some(id)) => id.to_string(),
            _ => GLOBAL_KEY.to_string(),
        }
    }

    /// Append an image, returning the number pending for `key` afterwards
    pub fn push(&self, key: &str, image: PendingImage) -> usize {
        let mut pending = self.lock();
        let list = pending.entry(key.to_string()).or_default();
        list.push(image);
        list.len()
    }

    /// Copy of the pending images for `key`, oldest first
    #[must_use]
    pub fn snapshot(&self, key: &str) -> Vec<PendingImage> {
        self.lock().get(key).cloned().unwrap_or_default()
    }

    /// Remove the given images from `key`, returning those actually removed
    ///
    /// Images appended after `consumed` was snapshotted are left in place.
    pub fn remove(&self, key: &str, consumed: &[PendingImage]) -> Vec<PendingImage> {
        let mut pending = self.lock();
        let Some(list) = pending.get_mut(key) else {
            return Vec::new();
        };

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(list)
            .into_iter()
            .partition(|image| consumed.iter().any(|c| c.path == image.path));
        *list = kept;

        if list.is_empty() {
            pending.remove(key);
        }
        removed
    }

    /// Drop images received before `cutoff` across all keys
    pub fn expire(&self, cutoff: DateTime<Utc>) -> Vec<PendingImage> {
        let mut pending = self.lock();
        let mut expired = Vec::new();

        pending.retain(|_, list| {
            let (old, fresh): (Vec<_>, Vec<_>) = std::mem::take(list)
                .into_iter()
                .partition(|image| image.received_at < cutoff);
            expired.extend(old);
            *list = fresh;
            !list.is_empty()
        });

        expired
    }

    /// Number of images pending for `key`
    #[must_use]
    pub fn len(&self, key: &str) -> usize {
        self.lock().get(key).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }

    /// Number of images pending across all keys
    #[must_use]
    pub fn total(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<PendingImage>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
