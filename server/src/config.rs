//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// Base URL that `{channel_id}/{token}` is appended to for outbound calls
    pub discord_webhook_base: String,

    /// Per-webhook delivery budget
    pub discord_rate_limit: DeliveryLimit,

    /// How long review comments and reviews wait for each other, in milliseconds (default: 500)
    pub review_comment_wait_ms: u64,

    /// Timeout for a single outbound request in seconds (default: 10)
    pub outbound_timeout_secs: u64,

    /// Maximum accepted webhook payload in bytes (default: 25MB, GitHub's cap)
    pub max_payload_size: usize,

    /// Where `/` and `/source` redirect to
    pub source_url: String,
}

/// Concurrency budget for one Discord webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryLimit {
    /// Deliveries allowed in flight at once
    pub capacity: usize,
    /// Seconds a finished delivery keeps its slot
    pub window_secs: u64,
}

impl Default for DeliveryLimit {
    fn default() -> Self {
        Self {
            capacity: 5,
            window_secs: 10,
        }
    }
}

impl DeliveryLimit {
    /// Release delay applied to every delivery slot.
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BIND_ADDRESS`: listen address (default: `0.0.0.0:8080`)
    /// - `DISCORD_WEBHOOK_BASE`: webhook base URL (default: `https://discord.com/api/webhooks`)
    /// - `DISCORD_RATE_LIMIT`: per-webhook budget as "capacity,window_secs" (default: `5,10`)
    /// - `REVIEW_COMMENT_WAIT_MS`: review/comment merge window (default: 500)
    /// - `OUTBOUND_TIMEOUT_SECS`: outbound request timeout (default: 10)
    /// - `MAX_PAYLOAD_SIZE`: request body limit in bytes (default: 25MB)
    /// - `SOURCE_URL`: redirect target for `/` and `/source`
    pub fn from_env() -> Result<Self> {
        let discord_rate_limit = match env::var("DISCORD_RATE_LIMIT") {
            Ok(val) => parse_delivery_limit(&val)
                .with_context(|| {
                    format!(
                        "DISCORD_RATE_LIMIT must be \"capacity,window_secs\" with 0 < capacity <= {}",
                        Semaphore::MAX_PERMITS
                    )
                })?,
            Err(_) => DeliveryLimit::default(),
        };

        let discord_webhook_base = env::var("DISCORD_WEBHOOK_BASE")
            .unwrap_or_else(|_| "https://discord.com/api/webhooks".into());
        if !discord_webhook_base.starts_with("http://")
            && !discord_webhook_base.starts_with("https://")
        {
            bail!("DISCORD_WEBHOOK_BASE must start with http:// or https://");
        }

        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            discord_webhook_base: discord_webhook_base.trim_end_matches('/').to_string(),
            discord_rate_limit,
            review_comment_wait_ms: env::var("REVIEW_COMMENT_WAIT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
            outbound_timeout_secs: env::var("OUTBOUND_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            max_payload_size: env::var("MAX_PAYLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(25 * 1024 * 1024), // 25MB
            source_url: env::var("SOURCE_URL")
                .unwrap_or_else(|_| "https://github.com/yourorg/hook-relay".into()),
        })
    }

    /// Merge window for pull request reviews and their comments.
    pub const fn review_comment_wait(&self) -> Duration {
        Duration::from_millis(self.review_comment_wait_ms)
    }

    /// Timeout for a single outbound request.
    pub const fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(self.outbound_timeout_secs)
    }

    /// Create a default configuration for testing.
    ///
    /// Points outbound traffic at a local address; tests that deliver
    /// anything override `discord_webhook_base` with their fake server.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            discord_webhook_base: "http://127.0.0.1:9/api/webhooks".into(),
            discord_rate_limit: DeliveryLimit {
                capacity: 5,
                window_secs: 0,
            },
            review_comment_wait_ms: 100,
            outbound_timeout_secs: 5,
            max_payload_size: 25 * 1024 * 1024,
            source_url: "https://example.com/hook-relay".into(),
        }
    }
}

/// Parses a delivery limit from "capacity,window_secs" format.
fn parse_delivery_limit(val: &str) -> Option<DeliveryLimit> {
    let parts: Vec<&str> = val.split(',').collect();
    if parts.len() == 2 {
        let capacity = parts[0]
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|c| (1..=Semaphore::MAX_PERMITS).contains(c))?;
        let window_secs = parts[1].trim().parse().ok()?;
        Some(DeliveryLimit {
            capacity,
            window_secs,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "BIND_ADDRESS",
        "DISCORD_WEBHOOK_BASE",
        "DISCORD_RATE_LIMIT",
        "REVIEW_COMMENT_WAIT_MS",
        "OUTBOUND_TIMEOUT_SECS",
        "MAX_PAYLOAD_SIZE",
        "SOURCE_URL",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.discord_webhook_base, "https://discord.com/api/webhooks");
        assert_eq!(config.discord_rate_limit, DeliveryLimit::default());
        assert_eq!(config.review_comment_wait(), Duration::from_millis(500));
        assert_eq!(config.outbound_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_payload_size, 25 * 1024 * 1024);
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        env::set_var("DISCORD_RATE_LIMIT", " 2 , 30 ");
        env::set_var("REVIEW_COMMENT_WAIT_MS", "250");
        env::set_var("DISCORD_WEBHOOK_BASE", "http://localhost:9000/api/webhooks/");
        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.discord_rate_limit.capacity, 2);
        assert_eq!(config.discord_rate_limit.window(), Duration::from_secs(30));
        assert_eq!(config.review_comment_wait(), Duration::from_millis(250));
        assert_eq!(config.discord_webhook_base, "http://localhost:9000/api/webhooks");
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_rejected() {
        clear_env();
        env::set_var("DISCORD_RATE_LIMIT", "0,10");
        assert!(Config::from_env().is_err());

        env::set_var("DISCORD_RATE_LIMIT", "5,10");
        env::set_var("DISCORD_WEBHOOK_BASE", "discord.com/api/webhooks");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_parse_delivery_limit() {
        let limit = parse_delivery_limit("5,10").unwrap();
        assert_eq!(limit.capacity, 5);
        assert_eq!(limit.window_secs, 10);

        assert!(parse_delivery_limit("5").is_none());
        assert!(parse_delivery_limit("5,10,15").is_none());
        assert!(parse_delivery_limit("abc,10").is_none());
        assert!(parse_delivery_limit("0,10").is_none());
        assert!(parse_delivery_limit(&format!("{},10", usize::MAX)).is_none());
        assert!(parse_delivery_limit(&format!("{},10", Semaphore::MAX_PERMITS)).is_some());
    }

    #[test]
    #[serial]
    fn test_oversized_capacity_is_rejected() {
        clear_env();
        env::set_var("DISCORD_RATE_LIMIT", format!("{},10", usize::MAX));
        let result = Config::from_env();
        clear_env();
        assert!(result.is_err());
    }
}
