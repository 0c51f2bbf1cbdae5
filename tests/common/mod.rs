#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use reqwest::Client;
use serde_json::{json, Value};

use when_events::config::{Config, FetchConfig};
use when_events::ingest::{FetchError, FetchResponse, Fetcher, HttpFetcher, Pipeline};
use when_events::schema::SchemaRegistry;
use when_events::store::{EventStore, MemoryStore};

// ── Scripted fetcher ────────────────────────────────────────────

enum Script {
    Respond(u16, String),
    Fail(String),
}

/// In-process stand-in for the HTTP client. Unscripted URLs answer 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn respond(&self, url: &str, status: u16, body: impl Into<String>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Respond(status, body.into()));
    }

    pub fn respond_json(&self, url: &str, body: &Value) {
        self.respond(url, 200, body.to_string());
    }

    pub fn fail(&self, url: &str, reason: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Fail(reason.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.scripts.lock().unwrap().get(url) {
            Some(Script::Respond(status, body)) => Ok(FetchResponse::new(*status, body.clone())),
            Some(Script::Fail(reason)) => Err(FetchError::Request(reason.clone())),
            None => Ok(FetchResponse::new(404, "Not Found")),
        }
    }
}

/// A pipeline over a scripted fetcher and an in-memory store.
pub struct TestPipeline {
    pub pipeline: Pipeline,
    pub fetcher: Arc<ScriptedFetcher>,
    pub store: Arc<MemoryStore>,
}

pub fn pipeline() -> TestPipeline {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let store = Arc::new(MemoryStore::new());
    let schemas = SchemaRegistry::builtin().expect("builtin schemas compile");

    let pipeline = Pipeline::new(
        fetcher.clone() as Arc<dyn Fetcher>,
        store.clone() as Arc<dyn EventStore>,
        Arc::new(schemas),
    );

    TestPipeline {
        pipeline,
        fetcher,
        store,
    }
}

/// A complete example payload for schema 0.1.0.
pub fn full_payload() -> Value {
    json!({
        "version": "0.1.0",
        "name": "PyCon",
        "shortName": "pycon-2025",
        "startDate": "2025-05-14",
        "endDate": "2025-05-22",
        "cfpDeadline": "2024-12-20T23:59:59Z",
        "timezone": "America/New_York",
        "organizer": "Python Software Foundation",
        "email": "pycon-reg@python.org",
        "isAccessibleForFree": false,
        "languages": ["en"],
        "maximumAttendeeCapacity": 3000,
        "location": "Pittsburgh, PA",
        "coordinates": "40.4406,-79.9959",
        "description": "The largest annual gathering of the Python community.",
        "color": "3776ab",
        "urls": {
            "home": "https://us.pycon.org/2025/",
            "tickets": "https://us.pycon.org/2025/attend/information/"
        },
        "hashtag": "pycon",
        "socialMediaAccounts": { "mastodon": "@pycon@fosstodon.org" },
        "tooling": { "cfp": "pretalx" },
        "tags": ["python", "programming"]
    })
}

// ── Upstream stub server ────────────────────────────────────────

type Routes = Arc<Mutex<HashMap<String, (u16, String)>>>;

/// An HTTP server playing the role of an event's own website.
pub struct Upstream {
    pub addr: SocketAddr,
    routes: Routes,
}

impl Upstream {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn serve(&self, path: &str, status: u16, body: impl Into<String>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.into()));
    }

    pub fn serve_json(&self, path: &str, body: &Value) {
        self.serve(path, 200, body.to_string());
    }
}

async fn upstream_handler(State(routes): State<Routes>, uri: Uri) -> impl IntoResponse {
    if uri.path() == "/slow" {
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
    let route = routes.lock().unwrap().get(uri.path()).cloned();
    match route {
        Some((status, body)) => (
            StatusCode::from_u16(status).unwrap(),
            [("content-type", "application/json")],
            body,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

pub async fn spawn_upstream() -> Upstream {
    let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
    let app = Router::new()
        .fallback(upstream_handler)
        .with_state(routes.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind upstream");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Upstream failed");
    });

    Upstream { addr, routes }
}

// ── Application under test ──────────────────────────────────────

pub fn test_config(keep_failed_submissions: bool) -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        log_level: "warn".to_string(),
        max_body_size: 65_536,
        fetch: FetchConfig {
            timeout: Duration::from_secs(1),
            max_response_size: 16_384,
            user_agent: "when-events-tests".to_string(),
        },
        schema_dir: None,
        keep_failed_submissions,
    }
}

/// A running app instance backed by an in-memory store, plus an upstream
/// server for it to fetch from.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub upstream: Upstream,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Submit a source URL, return (body, status).
    pub async fn submit(&self, source_url: &str) -> (Value, reqwest::StatusCode) {
        self.post(
            "/api/v1/events",
            &json!({ "url": source_url }),
        )
        .await
    }

    pub async fn get(&self, path: &str) -> (Value, reqwest::StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post(&self, path: &str, body: &Value) -> (Value, reqwest::StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn put(&self, path: &str) -> (Value, reqwest::StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(true)).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let upstream = spawn_upstream().await;
    let store = Arc::new(MemoryStore::new());
    let fetcher = HttpFetcher::new(&config.fetch).expect("Failed to build fetcher");
    let schemas = SchemaRegistry::builtin().expect("builtin schemas compile");

    let state = when_events::build_state(
        config,
        store.clone() as Arc<dyn EventStore>,
        Arc::new(fetcher),
        schemas,
    );
    let app = when_events::build_app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        upstream,
        store,
    }
}
