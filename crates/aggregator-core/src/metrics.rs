//! Prometheus metrics and health endpoint: the two counters the aggregation
//! path needs, served alongside a liveness probe on their own bind address.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{IntCounter, Registry, TextEncoder};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::error::FatalError;

/// Registry-backed counters for the aggregation pipeline.
pub struct Metrics {
    registry: Registry,
    aggregated_responses_total: IntCounter,
    aggregation_errors_total: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// # Panics
    /// Panics if the counters cannot be registered, which only happens on a
    /// name collision within the same registry.
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::new();

        let aggregated_responses_total = IntCounter::new(
            "aggregated_responses_total",
            "Total aggregated responses submitted on-chain successfully",
        )
        .expect("static metric name/help is valid");
        let aggregation_errors_total = IntCounter::new(
            "aggregation_errors_total",
            "Total aggregation or submission failures",
        )
        .expect("static metric name/help is valid");

        registry
            .register(Box::new(aggregated_responses_total.clone()))
            .expect("counter registered exactly once");
        registry
            .register(Box::new(aggregation_errors_total.clone()))
            .expect("counter registered exactly once");

        Self {
            registry,
            aggregated_responses_total,
            aggregation_errors_total,
        }
    }

    pub fn record_aggregated_response(&self) {
        self.aggregated_responses_total.inc();
    }

    pub fn record_aggregation_error(&self) {
        self.aggregation_errors_total.inc();
    }

    #[must_use]
    pub fn aggregated_responses_total(&self) -> u64 {
        self.aggregated_responses_total.get()
    }

    #[must_use]
    pub fn aggregation_errors_total(&self) -> u64 {
        self.aggregation_errors_total.get()
    }
}

/// Serves `/metrics` (Prometheus text exposition) and `/health` on its own
/// listener, shut down cooperatively alongside the rest of the lifecycle.
pub struct MetricsServer {
    metrics: Arc<Metrics>,
    bind_address: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MetricsServer {
    #[must_use]
    pub fn new(metrics: Arc<Metrics>, bind_address: SocketAddr) -> Self {
        Self {
            metrics,
            bind_address,
            shutdown_tx: None,
        }
    }

    /// Binds and serves until [`Self::stop`] is called or the returned task
    /// is dropped. A runtime serve error is reported on `fault_tx` rather
    /// than just logged, so the lifecycle can escalate it.
    ///
    /// # Errors
    /// Returns an error if the bind address cannot be acquired.
    pub async fn start(&mut self, fault_tx: mpsc::UnboundedSender<FatalError>) -> std::io::Result<()> {
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(self.metrics.clone());

        let listener = tokio::net::TcpListener::bind(self.bind_address).await?;
        let (tx, rx) = oneshot::channel();
        self.shutdown_tx = Some(tx);

        info!(address = %self.bind_address, "starting metrics server");

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
            {
                error!(error = %e, "metrics server terminated with error");
                let _ = fault_tx.send(FatalError::MetricsServer(e.to_string()));
            }
        });

        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MetricsServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    let encoder = TextEncoder::new();
    let families = metrics.registry.gather();
    match encoder.encode_to_string(&families) {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}
