//! Thin binary wiring config loading, logging, and the aggregator lifecycle.
//!
//! A live [`ChainAdapter`] (contract bindings, an RPC provider, a signer) is
//! out of scope for this crate; this binary runs against
//! [`MockChainAdapter`] so the full pipeline is exercisable end to end.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;

use blueprint_aggregator_core::{AggregatorConfig, Cli, Lifecycle, MockChainAdapter};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AggregatorConfig::load(&cli.config, &cli)
        .wrap_err_with(|| format!("failed to load configuration from {:?}", cli.config))?;

    tracing::info!(
        rpc_bind_address = %config.rpc_bind_address,
        metrics_bind_address = %config.metrics_bind_address,
        quorums = config.quorums.len(),
        "starting aggregator"
    );

    let chain = MockChainAdapter::new();
    let mut lifecycle = Lifecycle::start(config, chain)
        .await
        .wrap_err("failed to start aggregator lifecycle")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.wrap_err("failed to listen for shutdown signal")?;
            tracing::info!("shutdown signal received");
        }
        fault = lifecycle.wait_for_fault() => {
            lifecycle.shutdown().await;
            return Err(fault).wrap_err("aggregator encountered a fatal error");
        }
    }

    lifecycle.shutdown().await;
    Ok(())
}
