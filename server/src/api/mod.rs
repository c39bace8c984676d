//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::{
    config::Config,
    discord::DiscordClient,
    relay::{self, ReviewCorrelator},
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Outbound Discord client with per-webhook admission
    pub discord: DiscordClient,
    /// Reviews waiting for their comments
    pub reviews: Arc<ReviewCorrelator>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(config: Config, discord: DiscordClient) -> Self {
        let reviews = Arc::new(ReviewCorrelator::new(config.review_comment_wait()));
        Self {
            config: Arc::new(config),
            discord,
            reviews,
        }
    }
}

/// Path prefixes the relay answers on, mirroring Discord's own URL shapes.
const RELAY_PREFIXES: [&str; 4] = ["", "/api", "/webhooks", "/api/webhooks"];

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let max_payload_size = state.config.max_payload_size;

    let mut relay_routes: Router<AppState> = Router::new();
    for prefix in RELAY_PREFIXES {
        for suffix in ["", "/github"] {
            relay_routes = relay_routes.route(
                &format!("{prefix}/{{channel_id}}/{{token}}{suffix}"),
                post(relay::relay_webhook),
            );
        }
    }

    Router::new()
        .route("/", get(source_redirect))
        .route("/source", get(source_redirect))
        .route("/version", get(version))
        .route("/health", get(health_check))
        .merge(relay_routes)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(DefaultBodyLimit::max(max_payload_size))
        .with_state(state)
}

async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

async fn source_redirect(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        [(header::LOCATION, state.config.source_url.clone())],
    )
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Webhooks with an admission controller
    webhooks: usize,
    /// Reviews currently collecting comments
    pending_reviews: usize,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        webhooks: state.discord.limits().len(),
        pending_reviews: state.reviews.len(),
    })
}
