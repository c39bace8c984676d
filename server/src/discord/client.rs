//! Discord Webhook Client
//!
//! Every outbound call goes through the admission controller of the target
//! webhook, so bursts from GitHub are spread out instead of tripping
//! Discord's per-webhook limits. Discord's answer is handed back to the
//! caller as the relay's own response.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::response::Response;
use bytes::Bytes;
use tracing::{debug, instrument};

use super::{DiscordError, DiscordWebhook, Embed, WebhookMessage};
use crate::admission::ScopedRegistry;
use crate::config::Config;

/// Response headers that are not passed back to GitHub.
const DROPPED_HEADERS: [HeaderName; 4] = [
    header::STRICT_TRANSPORT_SECURITY,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
];

/// Client for Discord's "execute webhook" endpoints.
#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    /// Admission controllers keyed by full webhook URL.
    limits: Arc<ScopedRegistry<String>>,
}

impl DiscordClient {
    /// Build a client from the relay configuration.
    pub fn new(config: &Config) -> Result<Self, DiscordError> {
        let http = reqwest::Client::builder()
            .timeout(config.outbound_timeout())
            .user_agent(concat!("relay-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DiscordError::Client)?;

        Ok(Self {
            http,
            base_url: config.discord_webhook_base.as_str().into(),
            limits: Arc::new(ScopedRegistry::new(
                config.discord_rate_limit.capacity,
                config.discord_rate_limit.window(),
            )),
        })
    }

    /// Per-webhook admission controllers.
    pub fn limits(&self) -> &ScopedRegistry<String> {
        &self.limits
    }

    /// Post embeds to a webhook.
    #[instrument(skip(self, webhook, embeds), fields(channel_id = %webhook.channel_id, embeds = embeds.len()))]
    pub async fn send_embeds(
        &self,
        webhook: &DiscordWebhook,
        embeds: &[Embed],
    ) -> Result<Response, DiscordError> {
        let url = webhook.url(&self.base_url);
        let request = self.http.post(&url).json(&WebhookMessage { embeds });
        self.deliver(url, request).await
    }

    /// Forward an unmodified GitHub payload to the webhook's GitHub-compatible
    /// endpoint, which renders it with Discord's own formatting.
    #[instrument(skip(self, webhook, body), fields(channel_id = %webhook.channel_id, bytes = body.len()))]
    pub async fn forward_raw(
        &self,
        webhook: &DiscordWebhook,
        event: &str,
        body: Bytes,
    ) -> Result<Response, DiscordError> {
        let url = webhook.url(&self.base_url);
        let mut request = self
            .http
            .post(format!("{url}/github"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
        if !event.is_empty() {
            request = request.header("X-GitHub-Event", event);
        }
        self.deliver(url, request).await
    }

    /// Send `request` once the webhook's admission controller lets it through.
    async fn deliver(
        &self,
        webhook_url: String,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, DiscordError> {
        let controller = self.limits.controller_for(&webhook_url);
        controller
            .run(|| async move {
                let response = request.send().await?;
                debug!(status = response.status().as_u16(), "Discord responded");
                relay_response(response).await
            })
            .await
    }
}

/// Turn Discord's response into the relay's response.
async fn relay_response(response: reqwest::Response) -> Result<Response, DiscordError> {
    let status = response.status();
    let headers = passthrough_headers(response.headers());
    let body = response.bytes().await?;

    let mut relayed = Response::new(Body::from(body));
    *relayed.status_mut() = status;
    *relayed.headers_mut() = headers;
    Ok(relayed)
}

fn passthrough_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !DROPPED_HEADERS.contains(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
