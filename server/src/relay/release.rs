//! `release` events.

use axum::response::Response;

use super::events::ReleaseEvent;
use super::{author, clip, forward, parse, send_embed, RelayResult, RequestCtx};
use crate::api::AppState;
use crate::discord::Embed;

const NOTES_LIMIT: usize = 4096;

pub(super) async fn handle(state: &AppState, ctx: &RequestCtx) -> RelayResult<Response> {
    let event: ReleaseEvent = parse(ctx)?;
    match build_embed(&event) {
        Some(embed) => send_embed(state, ctx, embed).await,
        None => forward(state, ctx).await,
    }
}

fn build_embed(event: &ReleaseEvent) -> Option<Embed> {
    if event.action != "published" {
        return None;
    }
    let release = &event.release;
    let name = release
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(&release.tag_name);

    Some(Embed {
        author: Some(author(&release.author)),
        title: Some(format!(
            "[{}] New release published: {name}",
            event.repository.full_name
        )),
        description: release
            .body
            .as_deref()
            .filter(|b| !b.is_empty())
            .map(|b| clip(b, NOTES_LIMIT)),
        url: Some(release.html_url.clone()),
        timestamp: release.published_at.clone(),
        ..Embed::default()
    })
}
