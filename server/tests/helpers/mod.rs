//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for sending requests through the full axum router, and
//! [`FakeDiscord`], a local stand-in for Discord's webhook endpoints that
//! records every delivery it receives.
//!
//! ## Test Servers
//!
//! Use [`spawn_test_server()`] to serve any router on a random local port.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{self, HeaderMap, Method, Request, Response, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use http_body_util::BodyExt;
use relay_server::api::{create_router, AppState};
use relay_server::config::Config;
use relay_server::discord::DiscordClient;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tower::ServiceExt;

// ============================================================================
// Test Server
// ============================================================================

/// A running test server bound to a random port.
pub struct TestServer {
    /// Server address (127.0.0.1:PORT).
    pub addr: SocketAddr,
    /// Base URL for HTTP requests (e.g., `http://127.0.0.1:12345`).
    pub url: String,
    /// Handle to the server task for cleanup.
    _handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

/// Spawn a real HTTP server on a random port.
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });

    TestServer {
        addr,
        url,
        _handle: handle,
    }
}

// ============================================================================
// Fake Discord
// ============================================================================

/// One request received by [`FakeDiscord`].
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Request path, e.g. `/api/webhooks/123/token/github`.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Delivery {
    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("delivery body is JSON")
    }

    /// Whether this went to the GitHub-compatible endpoint.
    pub fn is_raw_forward(&self) -> bool {
        self.path.ends_with("/github")
    }
}

#[derive(Clone, Default)]
struct Recorder {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    notify: Arc<Notify>,
}

/// Local server that answers like Discord's "execute webhook" endpoint.
///
/// Every response carries a `Strict-Transport-Security` header so tests can
/// check it is not passed back to GitHub.
pub struct FakeDiscord {
    server: TestServer,
    recorder: Recorder,
}

impl FakeDiscord {
    pub async fn start() -> Self {
        let recorder = Recorder::default();
        let router = Router::new()
            .fallback(record_delivery)
            .with_state(recorder.clone());
        let server = spawn_test_server(router).await;
        Self { server, recorder }
    }

    /// Value for `DISCORD_WEBHOOK_BASE` pointing at this server.
    pub fn webhook_base(&self) -> String {
        format!("{}/api/webhooks", self.server.url)
    }

    /// Everything received so far.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.recorder.deliveries.lock().unwrap().clone()
    }

    /// Wait until at least `count` deliveries have arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<Delivery> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.recorder.notify.notified();
                let deliveries = self.deliveries();
                if deliveries.len() >= count {
                    return deliveries;
                }
                notified.await;
            }
        })
        .await
        .expect("timed out waiting for deliveries")
    }
}

async fn record_delivery(
    State(recorder): State<Recorder>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    recorder.deliveries.lock().unwrap().push(Delivery {
        path: uri.path().to_string(),
        headers,
        body,
    });
    recorder.notify.notify_waiters();

    (
        StatusCode::OK,
        [
            ("strict-transport-security", "max-age=31536000"),
            ("content-type", "application/json"),
            ("x-ratelimit-remaining", "4"),
        ],
        r#"{"delivered":true}"#,
    )
}

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub config: Arc<Config>,
}

impl TestApp {
    /// Create a test app whose Discord traffic goes to `discord`.
    pub fn new(discord: &FakeDiscord) -> Self {
        let mut config = Config::default_for_test();
        config.discord_webhook_base = discord.webhook_base();
        Self::with_config(config)
    }

    /// Create a test app with a custom config.
    pub fn with_config(config: Config) -> Self {
        let client = DiscordClient::new(&config).expect("Failed to build Discord client");
        let state = AppState::new(config, client);
        let config = Arc::clone(&state.config);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            config,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// POST a GitHub delivery of type `event` to `path`.
    pub async fn deliver(
        &self,
        path: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> Response<Body> {
        let request = Self::request(Method::POST, path)
            .header("content-type", "application/json")
            .header("x-github-event", event)
            .header("x-github-delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958")
            .body(Body::from(payload.to_string()))
            .expect("valid request");
        self.oneshot(request).await
    }
}

/// Relay path for a well-formed webhook.
pub const WEBHOOK_PATH: &str = "/api/webhooks/123456789/s3cret-T0ken";

/// Collect a response body as bytes.
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes()
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}

/// Collect a response body as UTF-8 text.
pub async fn body_to_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).expect("body is UTF-8")
}

// ============================================================================
// Payload builders
// ============================================================================

pub fn user(login: &str) -> serde_json::Value {
    serde_json::json!({
        "login": login,
        "html_url": format!("https://github.com/{login}"),
        "avatar_url": format!("https://avatars.example/{login}.png"),
    })
}

pub fn issue_event(action: &str, state_reason: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "action": action,
        "issue": {
            "number": 7,
            "title": "Crash on start",
            "html_url": "https://github.com/octo/app/issues/7",
            "state_reason": state_reason,
            "labels": [],
        },
        "repository": { "full_name": "octo/app", "private": false },
        "sender": user("mona"),
    })
}

pub fn pull_request_event(action: &str, merged: bool) -> serde_json::Value {
    serde_json::json!({
        "action": action,
        "number": 42,
        "pull_request": {
            "number": 42,
            "title": "Add retries",
            "html_url": "https://github.com/octo/app/pull/42",
            "merged": merged,
        },
        "repository": { "full_name": "octo/app" },
        "sender": user("mona"),
    })
}

pub fn review_event(
    action: &str,
    review_id: u64,
    state: &str,
    body: Option<&str>,
) -> serde_json::Value {
    serde_json::json!({
        "action": action,
        "review": {
            "id": review_id,
            "state": state,
            "body": body,
            "user": user("hubot"),
        },
        "pull_request": {
            "number": 42,
            "title": "Add retries",
            "html_url": "https://github.com/octo/app/pull/42",
        },
        "repository": { "full_name": "octo/app" },
        "sender": user("hubot"),
    })
}

pub fn review_comment_event(action: &str, review_id: u64, comment_id: u64) -> serde_json::Value {
    serde_json::json!({
        "action": action,
        "comment": {
            "id": comment_id,
            "pull_request_review_id": review_id,
            "body": "nit: rename this",
        },
        "repository": { "full_name": "octo/app" },
        "sender": user("hubot"),
    })
}

pub fn release_event(action: &str, name: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "action": action,
        "release": {
            "name": name,
            "tag_name": "v1.2.0",
            "html_url": "https://github.com/octo/app/releases/tag/v1.2.0",
            "published_at": "2024-05-01T12:00:00Z",
            "body": "Bug fixes",
            "author": user("releaser"),
        },
        "repository": { "full_name": "octo/app" },
    })
}
