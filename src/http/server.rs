//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router (`/metrics`, `/healthz`)
//! - Run one collect cycle per scrape under the scrape timeout
//! - Append exporter self-metrics to the check series
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::collector::{Collector, SampleBuffer};
use crate::resilience::deadline_after;

pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra time the request layer allows beyond the scrape deadline.
const RESPONSE_GRACE: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    pub handle: Option<PrometheusHandle>,
    pub scrape_timeout: Duration,
}

/// Scrape endpoint server.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let request_timeout = state.scrape_timeout + RESPONSE_GRACE;
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/healthz", get(health_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut buffer = SampleBuffer::new();
    let deadline = deadline_after(state.scrape_timeout);
    let summary = state.collector.collect(&mut buffer, Some(deadline)).await;

    if summary.aborted > 0 {
        tracing::warn!(
            aborted = summary.aborted,
            timeout_secs = state.scrape_timeout.as_secs_f64(),
            "Scrape exceeded its timeout"
        );
    }

    let mut body = buffer.render_prometheus();
    if let Some(handle) = &state.handle {
        body.push_str(&handle.render());
    }

    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body)
}

async fn health_handler() -> &'static str {
    "ok"
}
