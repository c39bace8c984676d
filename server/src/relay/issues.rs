//! `issues` events: reopened and closed get an embed, the rest is forwarded.

use axum::response::Response;

use super::events::IssuesEvent;
use super::{author, colors, forward, parse, send_embed, RelayResult, RequestCtx};
use crate::api::AppState;
use crate::discord::Embed;

pub(super) async fn handle(state: &AppState, ctx: &RequestCtx) -> RelayResult<Response> {
    let event: IssuesEvent = parse(ctx)?;
    match build_embed(&event) {
        Some(embed) => send_embed(state, ctx, embed).await,
        None => forward(state, ctx).await,
    }
}

fn build_embed(event: &IssuesEvent) -> Option<Embed> {
    let (action, color) = match event.action.as_str() {
        "reopened" => ("reopened".to_string(), colors::OPEN),
        "closed" => match event.issue.state_reason.as_deref() {
            Some(reason) => (
                format!("closed as {}", reason.replace('_', " ")),
                if reason == "completed" {
                    colors::DONE
                } else {
                    colors::NEUTRAL
                },
            ),
            None => ("closed".to_string(), colors::NEUTRAL),
        },
        _ => return None,
    };

    Some(Embed {
        author: Some(author(&event.sender)),
        title: Some(format!(
            "[{}] Issue {action}: #{} {}",
            event.repository.full_name, event.issue.number, event.issue.title
        )),
        url: Some(event.issue.html_url.clone()),
        color: Some(color),
        ..Embed::default()
    })
}
