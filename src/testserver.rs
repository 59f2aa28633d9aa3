//! A bundled `axum` HTTP server with deterministic routes, used by this
//! crate's own integration tests and importable by users exercising a
//! workflow locally without standing up a real backend.
//!
//! Grounded in `abp-daemon`'s `Router::new().route(...)` wiring (the pack's
//! other `axum = "0.8"` consumer).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Clone, Default)]
struct AppState {
    hits: Arc<AtomicU64>,
    recorded: Arc<Mutex<Vec<Value>>>,
}

/// A running instance of the bundled test server.
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    state: AppState,
}

impl TestServer {
    /// Binds to an ephemeral port on `127.0.0.1` and starts serving.
    pub async fn start() -> std::io::Result<Self> {
        Self::bind("127.0.0.1:0").await
    }

    /// Binds to `addr` and starts serving; port 0 picks an ephemeral port.
    pub async fn bind(addr: impl tokio::net::ToSocketAddrs) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let state = AppState::default();
        let app = router(state.clone());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { addr, handle, state })
    }

    /// The address this server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for this server, e.g. `http://127.0.0.1:54321`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Total requests observed across every route since this server started.
    pub fn hit_count(&self) -> u64 {
        self.state.hits.load(Ordering::Relaxed)
    }

    /// Every JSON body posted to `/echo` so far, in arrival order.
    pub fn recorded(&self) -> Vec<Value> {
        self.state.recorded.lock().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/echo", post(echo))
        .route("/fail", get(fail).post(fail))
        .route("/slow", get(slow).post(slow))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> StatusCode {
    state.hits.fetch_add(1, Ordering::Relaxed);
    StatusCode::OK
}

async fn echo(State(state): State<AppState>, Json(mut body): Json<Value>) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::Relaxed);
    state.recorded.lock().push(body.clone());
    if let Value::Object(map) = &mut body {
        if !map.contains_key("id") {
            map.insert("id".to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        if !map.contains_key("extracted_id") {
            let id = map.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            map.insert("extracted_id".to_string(), Value::String(id));
        }
    }
    Json(body)
}

async fn fail(State(state): State<AppState>) -> StatusCode {
    state.hits.fetch_add(1, Ordering::Relaxed);
    StatusCode::INTERNAL_SERVER_ERROR
}

#[derive(Deserialize)]
struct SlowParams {
    ms: Option<u64>,
}

async fn slow(State(state): State<AppState>, Query(params): Query<SlowParams>) -> StatusCode {
    state.hits.fetch_add(1, Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(params.ms.unwrap_or(0))).await;
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_returns_200() {
        let server = TestServer::start().await.unwrap();
        let resp = reqwest::get(format!("{}/health", server.url())).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn echo_injects_id_fields() {
        let server = TestServer::start().await.unwrap();
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{}/echo", server.url()))
            .json(&serde_json::json!({"name": "alice"}))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["name"], "alice");
        assert!(body["id"].is_string());
        assert_eq!(body["extracted_id"], body["id"]);
    }

    #[tokio::test]
    async fn fail_returns_500() {
        let server = TestServer::start().await.unwrap();
        let resp = reqwest::get(format!("{}/fail", server.url())).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn slow_delays_by_requested_milliseconds() {
        let server = TestServer::start().await.unwrap();
        let start = std::time::Instant::now();
        let resp = reqwest::get(format!("{}/slow?ms=50", server.url())).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn hit_count_and_recorded_bodies_accumulate() {
        let server = TestServer::start().await.unwrap();
        let client = reqwest::Client::new();
        let _ = reqwest::get(format!("{}/health", server.url())).await.unwrap();
        let _ = client
            .post(format!("{}/echo", server.url()))
            .json(&serde_json::json!({"id": "fixed"}))
            .send()
            .await
            .unwrap();
        assert_eq!(server.hit_count(), 2);
        assert_eq!(server.recorded(), vec![serde_json::json!({"id": "fixed"})]);
    }
}
