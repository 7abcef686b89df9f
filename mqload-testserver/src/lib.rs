//! A fake "service under test": it exposes the JSON metrics document the load harness polls
//! and lets tests drive the counters behind it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_METRICS: &str = "/metrics";
pub const PATH_METRICS_SLOW: &str = "/metrics/slow";
pub const PATH_METRICS_ERROR: &str = "/metrics/error";
pub const PATH_METRICS_GARBAGE: &str = "/metrics/garbage";

/// How `/metrics` answers. The dedicated `/metrics/*` routes always behave as named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MetricsMode {
    Healthy = 0,
    Slow = 1,
    Error = 2,
    Garbage = 3,
}

impl MetricsMode {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Slow,
            2 => Self::Error,
            3 => Self::Garbage,
            _ => Self::Healthy,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    total_messages: AtomicU64,
    pool_active: AtomicU64,
    pool_idle: AtomicU64,
    pool_total: AtomicU64,
    requests_total: AtomicU64,
    mode: AtomicU8,
    slow_delay_ms: AtomicU64,
}

/// Shared handle to the fake service's state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MetricsState {
    inner: Arc<Counters>,
}

impl Default for MetricsState {
    fn default() -> Self {
        let state = Self {
            inner: Arc::new(Counters::default()),
        };
        state.set_pool(0, 10, 10);
        state.set_slow_delay(Duration::from_millis(500));
        state
    }
}

impl MetricsState {
    pub fn add_messages(&self, n: u64) {
        self.inner.total_messages.fetch_add(n, Ordering::Relaxed);
    }

    pub fn total_messages(&self) -> u64 {
        self.inner.total_messages.load(Ordering::Relaxed)
    }

    pub fn set_pool(&self, active: u64, idle: u64, total: u64) {
        self.inner.pool_active.store(active, Ordering::Relaxed);
        self.inner.pool_idle.store(idle, Ordering::Relaxed);
        self.inner.pool_total.store(total, Ordering::Relaxed);
    }

    pub fn set_mode(&self, mode: MetricsMode) {
        self.inner.mode.store(mode as u8, Ordering::Relaxed);
    }

    pub fn mode(&self) -> MetricsMode {
        MetricsMode::from_u8(self.inner.mode.load(Ordering::Relaxed))
    }

    pub fn set_slow_delay(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.inner.slow_delay_ms.store(ms, Ordering::Relaxed);
    }

    fn slow_delay(&self) -> Duration {
        Duration::from_millis(self.inner.slow_delay_ms.load(Ordering::Relaxed))
    }

    /// Metrics requests served, whatever the outcome.
    pub fn requests_total(&self) -> u64 {
        self.inner.requests_total.load(Ordering::Relaxed)
    }

    fn inc_requests_total(&self) {
        self.inner.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    fn document(&self) -> serde_json::Value {
        json!({
            "coreQueries": {
                "totalMessages": self.total_messages(),
            },
            "connectionPool": {
                "active": self.inner.pool_active.load(Ordering::Relaxed),
                "idle": self.inner.pool_idle.load(Ordering::Relaxed),
                "total": self.inner.pool_total.load(Ordering::Relaxed),
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct TestServerUrls {
    pub base_url: String,
    pub metrics: String,
    pub metrics_slow: String,
    pub metrics_error: String,
    pub metrics_garbage: String,
}

impl TestServerUrls {
    pub fn new(base_url: String) -> Self {
        Self {
            metrics: format!("{base_url}{PATH_METRICS}"),
            metrics_slow: format!("{base_url}{PATH_METRICS_SLOW}"),
            metrics_error: format!("{base_url}{PATH_METRICS_ERROR}"),
            metrics_garbage: format!("{base_url}{PATH_METRICS_GARBAGE}"),
            base_url,
        }
    }
}

async fn respond(state: &MetricsState, mode: MetricsMode) -> Response {
    state.inc_requests_total();
    match mode {
        MetricsMode::Healthy => axum::Json(state.document()).into_response(),
        MetricsMode::Slow => {
            sleep(state.slow_delay()).await;
            axum::Json(state.document()).into_response()
        }
        MetricsMode::Error => {
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics backend down").into_response()
        }
        MetricsMode::Garbage => (StatusCode::OK, "<html>not json</html>").into_response(),
    }
}

async fn handle_metrics(State(state): State<MetricsState>) -> Response {
    let mode = state.mode();
    respond(&state, mode).await
}

async fn handle_metrics_slow(State(state): State<MetricsState>) -> Response {
    respond(&state, MetricsMode::Slow).await
}

async fn handle_metrics_error(State(state): State<MetricsState>) -> Response {
    respond(&state, MetricsMode::Error).await
}

async fn handle_metrics_garbage(State(state): State<MetricsState>) -> Response {
    respond(&state, MetricsMode::Garbage).await
}

pub fn router(state: MetricsState) -> Router {
    Router::new()
        .route(PATH_METRICS, get(handle_metrics))
        .route(PATH_METRICS_SLOW, get(handle_metrics_slow))
        .route(PATH_METRICS_ERROR, get(handle_metrics_error))
        .route(PATH_METRICS_GARBAGE, get(handle_metrics_garbage))
        .with_state(state)
}

/// Advances the message counter by `per_sec` every second, like a consumer draining a queue.
pub fn spawn_consumer(state: MetricsState, per_sec: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await;
        loop {
            interval.tick().await;
            state.add_messages(per_sec);
        }
    })
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    urls: TestServerUrls,
    state: MetricsState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = MetricsState::default();
        let app = router(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        let base_url = format!("http://{addr}");
        let urls = TestServerUrls::new(base_url.clone());

        Ok(Self {
            addr,
            base_url,
            urls,
            state,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn urls(&self) -> &TestServerUrls {
        &self.urls
    }

    pub fn state(&self) -> &MetricsState {
        &self.state
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
