//! Webhook endpoints for channel integrations

use std::sync::Arc;

use axum::{Router, routing::post};

use super::ApiState;

pub mod line;

/// Build webhooks router (nested under `/api/webhooks`)
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/line", post(line::handle_callback))
        .with_state(state)
}

/// Root-level `/callback` route, the path LINE channels are usually pointed at
pub fn callback_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/callback", post(line::handle_callback))
        .with_state(state)
}
