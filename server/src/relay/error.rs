//! Relay Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::discord::DiscordError;

/// Errors returned to GitHub by the relay endpoint.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Channel id or token in the URL failed validation.
    #[error("Invalid discord webhook ID/token")]
    InvalidWebhook,

    /// Payload did not match the shape of its event.
    #[error("Error while parsing input JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Event action GitHub does not document.
    #[error("how did we get here?")]
    UnexpectedAction(String),

    /// Outbound delivery failed.
    #[error(transparent)]
    Discord(#[from] DiscordError),
}

impl RelayError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidWebhook => StatusCode::UNAUTHORIZED,
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::UnexpectedAction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Discord(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            Self::Discord(e) => e.into_response(),
            other => {
                if let Self::UnexpectedAction(action) = &other {
                    tracing::error!(action = %action, "Unexpected event action");
                }
                (other.status(), other.to_string()).into_response()
            }
        }
    }
}

/// Result type for relay handlers.
pub type RelayResult<T> = Result<T, RelayError>;
