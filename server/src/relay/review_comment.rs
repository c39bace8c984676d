//! `pull_request_review_comment` events.

use axum::response::Response;

use super::events::PullRequestReviewCommentEvent;
use super::{forward, no_content, parse, RelayResult, RequestCtx};
use crate::api::AppState;
use crate::correlation::ChildOutcome;

pub(super) async fn handle(state: &AppState, ctx: &RequestCtx) -> RelayResult<Response> {
    let event: PullRequestReviewCommentEvent = parse(ctx)?;
    if event.action != "created" {
        return Ok(no_content());
    }

    let Some(review_id) = event.comment.pull_request_review_id else {
        return forward(state, ctx).await;
    };

    match state.reviews.register_child(review_id, event.comment.id).await {
        ChildOutcome::Merged => Ok(no_content()),
        ChildOutcome::Independent => forward(state, ctx).await,
    }
}
