//! `pull_request` events.

use axum::response::Response;

use super::events::PullRequestEvent;
use super::{author, colors, forward, parse, send_embed, RelayResult, RequestCtx};
use crate::api::AppState;
use crate::discord::Embed;

pub(super) async fn handle(state: &AppState, ctx: &RequestCtx) -> RelayResult<Response> {
    let event: PullRequestEvent = parse(ctx)?;
    match build_embed(&event) {
        Some(embed) => send_embed(state, ctx, embed).await,
        None => forward(state, ctx).await,
    }
}

fn build_embed(event: &PullRequestEvent) -> Option<Embed> {
    let (action, color) = match event.action.as_str() {
        "converted_to_draft" => ("converted to draft", colors::NEUTRAL),
        "ready_for_review" => ("ready for review", colors::READY),
        "reopened" => ("reopened", colors::OPEN),
        "closed" if event.pull_request.merged => ("merged", colors::DONE),
        "closed" => ("closed", colors::CLOSED),
        _ => return None,
    };

    Some(Embed {
        author: Some(author(&event.sender)),
        title: Some(format!(
            "[{}] Pull request {action}: #{} {}",
            event.repository.full_name, event.pull_request.number, event.pull_request.title
        )),
        url: Some(event.pull_request.html_url.clone()),
        color: Some(color),
        ..Embed::default()
    })
}
