//! Discord Webhook Delivery
//!
//! Outbound side of the relay: embed types, the webhook address, and the
//! HTTP client that posts to Discord under a per-webhook admission budget.

pub mod client;
pub mod error;
pub mod types;

pub use client::DiscordClient;
pub use error::DiscordError;
pub use types::*;
