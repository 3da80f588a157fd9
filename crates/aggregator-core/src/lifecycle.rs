//! Process-level wiring: starts the RPC server, the metrics server, the
//! chain-event consumption loop, the aggregated-response consumption loop,
//! and a periodic expiry sweep, then waits for cooperative shutdown.
//!
//! Every loop is a `tokio::spawn`ed task holding a clone of a `watch<bool>`
//! shutdown signal; `Lifecycle::shutdown` flips it and joins every handle.
//! A task that hits a condition the caller should treat as fatal (RPC/metrics
//! server failure, chain subscription termination) reports it on a shared
//! channel instead of just logging; [`Lifecycle::wait_for_fault`] surfaces
//! the first one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::aggregation::BlsAggregator;
use crate::chain::ChainAdapter;
use crate::config::AggregatorConfig;
use crate::coordinator::{AggregationCoordinator, AggregationPolicy};
use crate::error::FatalError;
use crate::metrics::{Metrics, MetricsServer};
use crate::registry::BatchRegistry;
use crate::rpc;

/// A running aggregator instance. Dropping or calling [`Lifecycle::shutdown`]
/// stops every background task.
pub struct Lifecycle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    metrics: Arc<Metrics>,
    metrics_server: MetricsServer,
    coordinator: Arc<AggregationCoordinator>,
    fault_rx: mpsc::UnboundedReceiver<FatalError>,
    /// Kept alive so `fault_rx` only ever closes when `Lifecycle` itself is dropped.
    _fault_tx: mpsc::UnboundedSender<FatalError>,
}

impl Lifecycle {
    /// Builds every component and spawns the background tasks described in
    /// the component design: RPC ingress, metrics export, chain-event
    /// consumption, aggregated-response consumption, and periodic expiry
    /// sweeps.
    ///
    /// # Errors
    /// Returns a [`FatalError`] if the RPC or metrics listeners fail to bind.
    pub async fn start(
        config: AggregatorConfig,
        chain: Arc<dyn ChainAdapter>,
    ) -> Result<Self, FatalError> {
        let registry = BatchRegistry::new();
        let aggregator = Arc::new(BlsAggregator::new());
        let metrics = Arc::new(Metrics::new());
        let policy = AggregationPolicy {
            quorums: config.quorums.clone(),
            time_to_expiry: config.time_to_expiry,
        };

        let coordinator = Arc::new(AggregationCoordinator::new(
            registry,
            Arc::clone(&aggregator),
            Arc::clone(&chain),
            Arc::clone(&metrics),
            policy,
        ));

        let (shutdown_tx, _) = watch::channel(false);
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();
        let mut tasks = Vec::new();

        // Bind synchronously so a failure here fails `start` itself rather
        // than surfacing later from inside a spawned task.
        let rpc_listener = tokio::net::TcpListener::bind(config.rpc_bind_address)
            .await
            .map_err(|e| FatalError::RpcServer(e.to_string()))?;

        tasks.push(spawn_rpc_server(
            Arc::clone(&coordinator),
            rpc_listener,
            fault_tx.clone(),
            shutdown_tx.subscribe(),
        ));

        let mut metrics_server = MetricsServer::new(Arc::clone(&metrics), config.metrics_bind_address);
        if config.enable_metrics {
            metrics_server
                .start(fault_tx.clone())
                .await
                .map_err(|e| FatalError::MetricsServer(e.to_string()))?;
        }

        tasks.push(spawn_chain_event_loop(
            Arc::clone(&coordinator),
            Arc::clone(&chain),
            fault_tx.clone(),
            shutdown_tx.subscribe(),
        ));

        tasks.push(spawn_aggregated_response_loop(
            Arc::clone(&coordinator),
            Arc::clone(&aggregator),
            shutdown_tx.subscribe(),
        ));

        tasks.push(spawn_expiry_sweep(
            Arc::clone(&aggregator),
            config.expiry_sweep_interval,
            shutdown_tx.subscribe(),
        ));

        Ok(Self {
            shutdown_tx,
            tasks,
            metrics,
            metrics_server,
            coordinator,
            fault_rx,
            _fault_tx: fault_tx,
        })
    }

    /// Waits for the first fatal condition reported by a background task
    /// (RPC/metrics server failure, chain subscription termination). A
    /// caller should race this against its own shutdown trigger and call
    /// [`Self::shutdown`] either way.
    pub async fn wait_for_fault(&mut self) -> FatalError {
        self.fault_rx
            .recv()
            .await
            .expect("Lifecycle holds a fault_tx clone for its own lifetime")
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<AggregationCoordinator> {
        &self.coordinator
    }

    /// Signals every background task to stop and waits for them to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        self.metrics_server.stop();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

fn spawn_rpc_server(
    coordinator: Arc<AggregationCoordinator>,
    listener: tokio::net::TcpListener,
    fault_tx: mpsc::UnboundedSender<FatalError>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let app = rpc::router(coordinator);
    let bind_address = listener
        .local_addr()
        .unwrap_or_else(|_| ([0, 0, 0, 0], 0).into());

    tokio::spawn(async move {
        info!(address = %bind_address, "starting operator RPC server");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
        {
            error!(error = %e, "RPC server terminated with error");
            let _ = fault_tx.send(FatalError::RpcServer(e.to_string()));
        }
    })
}

fn spawn_chain_event_loop(
    coordinator: Arc<AggregationCoordinator>,
    chain: Arc<dyn ChainAdapter>,
    fault_tx: mpsc::UnboundedSender<FatalError>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let mut events = chain.subscribe_new_batches();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(Ok(event)) => {
                            coordinator.on_new_batch(event.root, event.created_block).await;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "chain event stream reported an error");
                            let _ = fault_tx.send(FatalError::ChainSubscription(e));
                            break;
                        }
                        None => {
                            error!("chain event stream closed");
                            let _ = fault_tx.send(FatalError::ChainSubscription(
                                crate::error::ChainError::Subscription("stream closed".to_string()),
                            ));
                            break;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("chain event loop shutting down");
                        break;
                    }
                }
            }
        }
    })
}

fn spawn_aggregated_response_loop(
    coordinator: Arc<AggregationCoordinator>,
    aggregator: Arc<BlsAggregator>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let mut responses = aggregator.response_stream();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                response = responses.recv() => {
                    match response {
                        Some(response) => coordinator.on_aggregated(response).await,
                        None => {
                            warn!("aggregated response stream closed");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("aggregated response loop shutting down");
                        break;
                    }
                }
            }
        }
    })
}

fn spawn_expiry_sweep(
    aggregator: Arc<BlsAggregator>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let expired = aggregator.sweep_expired();
                    if expired > 0 {
                        info!(expired, "swept expired aggregation tasks");
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("expiry sweep shutting down");
                        break;
                    }
                }
            }
        }
    })
}
