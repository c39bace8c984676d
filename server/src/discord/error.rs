//! Discord delivery errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised while talking to Discord.
#[derive(Debug, Error)]
pub enum DiscordError {
    /// HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Request failed before a response was received, or the body could not be read.
    #[error("Failed to reach Discord: {0}")]
    Request(#[from] reqwest::Error),
}

impl IntoResponse for DiscordError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Request(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Request(_) => StatusCode::BAD_GATEWAY,
            Self::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(status = status.as_u16(), error = %self, "Discord delivery failed");
        (status, self.to_string()).into_response()
    }
}
