//! LINE webhook handler

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::api::ApiState;
use crate::{Error, Result};
use crate::line::WebhookBody;
use crate::line::signature::{self, SIGNATURE_HEADER};

/// LINE webhook response
#[derive(Serialize)]
pub struct WebhookResponse {
    pub ok: bool,
}

fn respond(status: StatusCode) -> (StatusCode, Json<WebhookResponse>) {
    (
        status,
        Json(WebhookResponse {
            ok: status.is_success(),
        }),
    )
}

/// Check the signature over the raw body, then decode it
fn verified_body(state: &ApiState, headers: &HeaderMap, body: &[u8]) -> Result<WebhookBody> {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Signature("missing X-Line-Signature header".to_string()))?;

    if !signature::verify(state.channel_secret.expose_secret(), body, provided) {
        return Err(Error::Signature("signature mismatch".to_string()));
    }

    serde_json::from_slice(body).map_err(|e| Error::Payload(e.to_string()))
}

/// Handle an incoming LINE webhook request
///
/// Nothing is parsed or mutated before the signature checks out. Events are
/// then handled in order within this request; a failed reply or content
/// download aborts the request with 500. Model failures never reach here:
/// they are answered with the fallback text.
pub async fn handle_callback(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    let payload = match verified_body(&state, &headers, &body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "rejected LINE webhook");
            return respond(StatusCode::BAD_REQUEST);
        }
    };

    tracing::info!(
        destination = %payload.destination,
        events = payload.events.len(),
        "received LINE webhook"
    );

    for event in &payload.events {
        if let Err(e) = state.relay.dispatch(event).await {
            tracing::error!(error = %e, "LINE event handling failed");
            return respond(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    respond(StatusCode::OK)
}
