//! GitHub Event Relay
//!
//! Turns selected GitHub webhook events into Discord embeds and forwards
//! everything else to Discord's GitHub-compatible endpoint untouched.
//!
//! Pull request reviews and their review comments arrive as separate,
//! unordered deliveries. Comments that land within the merge window are
//! folded into the review's embed as a count; stragglers are forwarded on
//! their own.

pub mod error;
pub mod events;
pub mod handlers;
mod issues;
mod pull_request;
mod release;
mod review;
mod review_comment;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::api::AppState;
use crate::correlation::Correlator;
use crate::discord::{DiscordWebhook, Embed, EmbedAuthor};

pub use error::{RelayError, RelayResult};
pub use handlers::relay_webhook;

use events::User;

/// Pairs pull request reviews (by review id) with their comments (by comment id).
pub type ReviewCorrelator = Correlator<u64, u64>;

/// Embed colours, matching GitHub's own palette.
pub mod colors {
    pub const NEUTRAL: u32 = 0x212830;
    pub const OPEN: u32 = 0x1f883d;
    pub const DONE: u32 = 0x8250df;
    pub const CLOSED: u32 = 0xcf222e;
    pub const READY: u32 = 0xf6f8fa;
    pub const CHANGES_REQUESTED: u32 = 0xfc2121;
    pub const APPROVED: u32 = 0x009800;
}

/// One inbound delivery, validated and buffered.
#[derive(Debug, Clone)]
pub struct RequestCtx {
    /// Discord webhook the result goes to.
    pub webhook: DiscordWebhook,
    /// Value of the `X-GitHub-Event` header (empty if missing).
    pub event: String,
    /// Raw request body.
    pub body: Bytes,
}

/// Route a delivery to the handler for its event type.
pub async fn handle_event(state: &AppState, ctx: RequestCtx) -> RelayResult<Response> {
    match ctx.event.as_str() {
        "issues" => issues::handle(state, &ctx).await,
        "pull_request" => pull_request::handle(state, &ctx).await,
        "pull_request_review" => review::handle(state, &ctx).await,
        "pull_request_review_comment" => review_comment::handle(state, &ctx).await,
        "release" => release::handle(state, &ctx).await,
        _ => forward(state, &ctx).await,
    }
}

fn parse<T: DeserializeOwned>(ctx: &RequestCtx) -> RelayResult<T> {
    Ok(serde_json::from_slice(&ctx.body)?)
}

/// Hand the original payload to Discord unchanged.
async fn forward(state: &AppState, ctx: &RequestCtx) -> RelayResult<Response> {
    Ok(state
        .discord
        .forward_raw(&ctx.webhook, &ctx.event, ctx.body.clone())
        .await?)
}

async fn send_embed(state: &AppState, ctx: &RequestCtx, embed: Embed) -> RelayResult<Response> {
    Ok(state.discord.send_embeds(&ctx.webhook, &[embed]).await?)
}

fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn author(user: &User) -> EmbedAuthor {
    EmbedAuthor {
        name: user.login.clone(),
        url: Some(user.html_url.clone()),
        icon_url: Some(user.avatar_url.clone()),
    }
}

/// First `max_chars` characters of `text`.
fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// `text` if it is shorter than `max_chars`, otherwise cut so that the
/// result including a trailing `...` is exactly `max_chars` long.
fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() < max_chars {
        text.to_string()
    } else {
        format!("{}...", clip(text, max_chars.saturating_sub(3)))
    }
}
