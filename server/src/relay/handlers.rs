//! Relay Endpoint
//!
//! `POST {/api}?{/webhooks}?/{channel_id}/{token}{/github}?`

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use bytes::Bytes;
use tracing::{debug, instrument};

use super::{handle_event, RelayError, RelayResult, RequestCtx};
use crate::api::AppState;
use crate::discord::DiscordWebhook;

const GITHUB_EVENT: &str = "x-github-event";
const GITHUB_DELIVERY: &str = "x-github-delivery";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Receive a GitHub webhook and relay it to the Discord webhook named in the path.
#[instrument(skip_all, fields(channel_id = %channel_id, event = tracing::field::Empty))]
pub async fn relay_webhook(
    State(state): State<AppState>,
    Path((channel_id, token)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> RelayResult<Response> {
    let webhook = DiscordWebhook::parse(&channel_id, &token).ok_or(RelayError::InvalidWebhook)?;

    let event = header_str(&headers, GITHUB_EVENT).unwrap_or_default().to_string();
    tracing::Span::current().record("event", event.as_str());
    debug!(
        delivery = header_str(&headers, GITHUB_DELIVERY).unwrap_or("-"),
        bytes = body.len(),
        "Webhook received"
    );

    handle_event(&state, RequestCtx { webhook, event, body }).await
}
