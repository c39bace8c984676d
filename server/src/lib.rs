//! Hook Relay Server
//!
//! Receives GitHub webhooks and relays them to Discord, reformatting the
//! events Discord renders poorly and pacing delivery per webhook.

pub mod admission;
pub mod api;
pub mod config;
pub mod correlation;
pub mod discord;
pub mod relay;
