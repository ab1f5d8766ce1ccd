//! LINE Messaging API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use super::types::{Message, ReplyMessageRequest};
use crate::{Error, Result};

/// Messaging API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.line.me";

/// Content endpoint (binary downloads live on a separate host)
pub const DEFAULT_DATA_API_BASE: &str = "https://api-data.line.me";

/// Outbound calls the relay makes to the messaging platform
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Reply to an event using its one-time reply token
    ///
    /// # Errors
    ///
    /// Returns error if the platform rejects or never receives the reply
    async fn reply_message(&self, reply_token: &str, messages: &[Message]) -> Result<()>;

    /// Download the binary content of a user-sent message
    ///
    /// # Errors
    ///
    /// Returns error if the content cannot be fetched
    async fn get_message_content(&self, message_id: &str) -> Result<Vec<u8>>;
}

/// HTTP client for the LINE Messaging API
pub struct LineClient {
    client: Client,
    access_token: SecretString,
    api_base: String,
    data_api_base: String,
}

impl LineClient {
    /// Create a client authenticated with a channel access token
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(access_token: SecretString, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            access_token,
            api_base: DEFAULT_API_BASE.to_string(),
            data_api_base: DEFAULT_DATA_API_BASE.to_string(),
        })
    }

    /// Override both API hosts
    #[must_use]
    pub fn with_base_urls(mut self, api_base: impl Into<String>, data_api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.data_api_base = data_api_base.into();
        self
    }

    fn reply_url(&self) -> String {
        format!("{}/v2/bot/message/reply", self.api_base.trim_end_matches('/'))
    }

    fn content_url(&self, message_id: &str) -> String {
        format!(
            "{}/v2/bot/message/{message_id}/content",
            self.data_api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl MessagingApi for LineClient {
    async fn reply_message(&self, reply_token: &str, messages: &[Message]) -> Result<()> {
        let request = ReplyMessageRequest {
            reply_token,
            messages,
        };

        let response = self
            .client
            .post(self.reply_url())
            .bearer_auth(self.access_token.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!("LINE reply failed ({status}): {body}")));
        }

        tracing::debug!(count = messages.len(), "LINE reply sent");
        Ok(())
    }

    async fn get_message_content(&self, message_id: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.content_url(message_id))
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!(
                "LINE content fetch for {message_id} failed ({status}): {body}"
            )));
        }

        let bytes = response.bytes().await?;
        tracing::debug!(message_id, size = bytes.len(), "LINE content downloaded");
        Ok(bytes.to_vec())
    }
}
