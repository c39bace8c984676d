//! Discord Types
//!
//! Webhook addressing and the subset of the embed object the relay emits.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static CHANNEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("valid regex"));
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w-]+$").expect("valid regex"));

/// A Discord webhook identified by channel id and token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordWebhook {
    pub channel_id: String,
    token: String,
}

impl DiscordWebhook {
    /// Validate the path segments of an incoming relay URL.
    ///
    /// The channel id must be numeric and the token may only contain word
    /// characters and dashes, so neither can smuggle extra path segments
    /// into the outbound URL.
    pub fn parse(channel_id: &str, token: &str) -> Option<Self> {
        if CHANNEL_ID.is_match(channel_id) && TOKEN.is_match(token) {
            Some(Self {
                channel_id: channel_id.to_string(),
                token: token.to_string(),
            })
        } else {
            None
        }
    }

    /// Full webhook URL under `base`.
    pub fn url(&self, base: &str) -> String {
        format!("{base}/{}/{}", self.channel_id, self.token)
    }
}

/// Discord embed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    /// ISO 8601 timestamp shown in the embed footer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

/// Embed author line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Embed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// Body of an "execute webhook" call.
#[derive(Debug, Serialize)]
pub struct WebhookMessage<'a> {
    pub embeds: &'a [Embed],
}
