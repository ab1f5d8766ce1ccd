//! HTTP API server for the relay

pub mod health;
pub mod webhooks;

use std::sync::Arc;

use axum::Router;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::relay::Relay;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub relay: Arc<Relay>,
    /// Key for `X-Line-Signature` verification
    pub channel_secret: SecretString,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    relay: Arc<Relay>,
    channel_secret: SecretString,
    host: String,
    port: u16,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(relay: Arc<Relay>, channel_secret: SecretString) -> Self {
        Self {
            relay,
            channel_secret,
            host: "0.0.0.0".to_string(),
            port: crate::config::DEFAULT_PORT,
        }
    }

    /// Set the bind address
    #[must_use]
    pub fn host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    /// Set the listen port
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        ApiServer {
            state: Arc::new(ApiState {
                relay: self.relay,
                channel_secret: self.channel_secret,
            }),
            host: self.host,
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
}

impl ApiServer {
    /// Build the router with all routes
    ///
    /// The LINE webhook is served at `/callback` and `/api/webhooks/line`.
    pub fn router(state: Arc<ApiState>) -> Router {
        Router::new()
            .merge(webhooks::callback_router(state.clone()))
            .nest("/api/webhooks", webhooks::router(state.clone()))
            .merge(health::router())
            .merge(health::ready_router(state))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server on {addr}: {e}")))?;

        tracing::info!(addr = %addr, "API server listening");

        axum::serve(listener, Self::router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
