//! `pull_request_review` events.
//!
//! A submitted review waits for its comments to arrive (see
//! [`ReviewCorrelator`](super::ReviewCorrelator)) and reports how many it
//! absorbed as an embed field.

use axum::response::Response;
use tracing::debug;

use super::events::{PullRequestReviewEvent, ReviewState};
use super::{
    author, colors, ellipsize, no_content, parse, send_embed, RelayError, RelayResult, RequestCtx,
};
use crate::api::AppState;
use crate::discord::{Embed, EmbedField};

/// Description limit for reviews left by bot accounts.
const BOT_BODY_LIMIT: usize = 256;
/// Description limit for everyone else (Discord's own embed limit).
const BODY_LIMIT: usize = 4096;

pub(super) async fn handle(state: &AppState, ctx: &RequestCtx) -> RelayResult<Response> {
    let event: PullRequestReviewEvent = parse(ctx)?;
    match event.action.as_str() {
        "submitted" => submitted(state, ctx, &event).await,
        "edited" => Ok(no_content()),
        "dismissed" => send_embed(state, ctx, dismissed_embed(&event)).await,
        other => Err(RelayError::UnexpectedAction(other.to_string())),
    }
}

async fn submitted(
    state: &AppState,
    ctx: &RequestCtx,
    event: &PullRequestReviewEvent,
) -> RelayResult<Response> {
    // Bodiless "commented" reviews are the wrapper GitHub creates around a
    // single line comment; the comment itself is relayed instead.
    if event.review.state == ReviewState::Commented && event.review.body.is_none() {
        return Ok(no_content());
    }

    let comments = state.reviews.collect(event.review.id).await;
    debug!(review_id = event.review.id, comments, "Review comments collected");
    send_embed(state, ctx, submitted_embed(event, comments)).await
}

fn submitted_embed(event: &PullRequestReviewEvent, comments: usize) -> Embed {
    let color = match event.review.state {
        ReviewState::ChangesRequested => colors::CHANGES_REQUESTED,
        ReviewState::Approved => colors::APPROVED,
        ReviewState::Commented | ReviewState::Dismissed | ReviewState::Unknown => colors::NEUTRAL,
    };
    let limit = if event.review.user.login.ends_with("[bot]") {
        BOT_BODY_LIMIT
    } else {
        BODY_LIMIT
    };

    let mut fields = Vec::new();
    if comments > 0 {
        fields.push(EmbedField {
            name: format!("+ {comments} comments"),
            value: "\u{00A0}".to_string(),
        });
    }

    Embed {
        author: Some(author(&event.sender)),
        title: Some(format!(
            "[{}] Pull request review submitted: #{} {}",
            event.repository.full_name, event.pull_request.number, event.pull_request.title
        )),
        description: event.review.body.as_deref().map(|body| ellipsize(body, limit)),
        url: Some(event.pull_request.html_url.clone()),
        color: Some(color),
        fields,
        ..Embed::default()
    }
}

fn dismissed_embed(event: &PullRequestReviewEvent) -> Embed {
    Embed {
        author: Some(author(&event.sender)),
        title: Some(format!(
            "[{}] Pull request review dismissed: #{} {}",
            event.repository.full_name, event.pull_request.number, event.pull_request.title
        )),
        description: Some(format!(
            "**{}** dismissed **{}**'s review",
            event.sender.login, event.review.user.login
        )),
        url: Some(event.pull_request.html_url.clone()),
        color: Some(colors::NEUTRAL),
        ..Embed::default()
    }
}
