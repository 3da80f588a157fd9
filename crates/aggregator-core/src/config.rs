//! Configuration loading: a YAML file for addresses and tuning knobs plus
//! CLI flags/env vars for deployment-specific overrides. File values are
//! loaded first and then overridden by whichever CLI flags were set.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_primitives::Address;
use clap::Parser;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::QuorumSpec;

/// CLI entry point: `--config FILE` plus overrides for the bind addresses
/// and the signing key.
#[derive(Parser, Debug)]
#[command(author, version, about = "BLS signature aggregator for proof-verification batches")]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", env = "AGGREGATOR_CONFIG_PATH")]
    pub config: PathBuf,

    /// Hex-encoded ECDSA private key used to sign submission transactions.
    /// Never logged.
    #[arg(long, env = "ECDSA_PRIVATE_KEY", hide_env_values = true)]
    pub ecdsa_private_key: Option<String>,

    /// Overrides the operator RPC bind address from the config file.
    #[arg(long, value_name = "ADDR")]
    pub rpc_bind_address: Option<SocketAddr>,

    /// Overrides the metrics bind address from the config file.
    #[arg(long, value_name = "ADDR")]
    pub metrics_bind_address: Option<SocketAddr>,

    /// Log level passed to the tracing filter (e.g. `info`, `debug`).
    #[arg(long, value_name = "LEVEL", env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// On-disk YAML shape: chain endpoint, bind addresses, quorum policy, and
/// expiry tuning.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    eth_rpc_url: String,
    eth_ws_url: String,
    rpc_bind_address: SocketAddr,
    metrics_bind_address: SocketAddr,
    avs_service_manager_address: Address,
    registry_coordinator_address: Address,
    operator_state_retriever_address: Address,
    #[serde(default = "default_quorums")]
    quorums: Vec<QuorumSpec>,
    #[serde(default = "default_time_to_expiry_secs")]
    time_to_expiry_secs: u64,
    #[serde(default = "default_expiry_sweep_interval_secs")]
    expiry_sweep_interval_secs: u64,
    #[serde(default)]
    enable_metrics: bool,
}

fn default_quorums() -> Vec<QuorumSpec> {
    vec![QuorumSpec::default()]
}

fn default_time_to_expiry_secs() -> u64 {
    100
}

fn default_expiry_sweep_interval_secs() -> u64 {
    10
}

/// Fully resolved configuration driving a [`crate::lifecycle::Lifecycle`].
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub eth_rpc_url: String,
    pub eth_ws_url: String,
    pub rpc_bind_address: SocketAddr,
    pub metrics_bind_address: SocketAddr,
    /// Address of the on-chain contract that owns batch roots and
    /// aggregated-response submission. Consumed by a [`crate::chain::ChainAdapter`]
    /// implementation; unused by [`crate::chain::MockChainAdapter`].
    pub avs_service_manager_address: Address,
    pub registry_coordinator_address: Address,
    pub operator_state_retriever_address: Address,
    pub quorums: Vec<QuorumSpec>,
    pub time_to_expiry: Duration,
    pub expiry_sweep_interval: Duration,
    pub enable_metrics: bool,
    /// Hex-encoded, kept out of any `Debug`/log output beyond this struct's
    /// own derive, which is never emitted wholesale.
    pub ecdsa_private_key: String,
}

impl AggregatorConfig {
    /// Loads the YAML file at `path`, then applies CLI/env overrides.
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid YAML in the expected shape,
    /// or [`ConfigError::MissingValue`] if the ECDSA private key is absent
    /// or empty in both the CLI flag and the `ECDSA_PRIVATE_KEY` env var.
    pub fn load(path: &Path, cli: &Cli) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let raw: ConfigFile =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let ecdsa_private_key = cli
            .ecdsa_private_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingValue("ecdsa_private_key"))?;

        Ok(Self {
            eth_rpc_url: raw.eth_rpc_url,
            eth_ws_url: raw.eth_ws_url,
            rpc_bind_address: cli.rpc_bind_address.unwrap_or(raw.rpc_bind_address),
            metrics_bind_address: cli.metrics_bind_address.unwrap_or(raw.metrics_bind_address),
            avs_service_manager_address: raw.avs_service_manager_address,
            registry_coordinator_address: raw.registry_coordinator_address,
            operator_state_retriever_address: raw.operator_state_retriever_address,
            quorums: raw.quorums,
            time_to_expiry: Duration::from_secs(raw.time_to_expiry_secs),
            expiry_sweep_interval: Duration::from_secs(raw.expiry_sweep_interval_secs),
            enable_metrics: raw.enable_metrics,
            ecdsa_private_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(config: &str) -> Cli {
        Cli {
            config: PathBuf::from(config),
            ecdsa_private_key: Some("0xdeadbeef".to_string()),
            rpc_bind_address: None,
            metrics_bind_address: None,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn loads_defaults_when_optional_fields_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
eth_rpc_url: "http://localhost:8545"
eth_ws_url: "ws://localhost:8546"
rpc_bind_address: "127.0.0.1:9090"
metrics_bind_address: "127.0.0.1:9091"
avs_service_manager_address: "0x0000000000000000000000000000000000000001"
registry_coordinator_address: "0x0000000000000000000000000000000000000002"
operator_state_retriever_address: "0x0000000000000000000000000000000000000003"
"#,
        )
        .unwrap();

        let config = AggregatorConfig::load(&path, &cli(path.to_str().unwrap())).unwrap();
        assert_eq!(config.time_to_expiry, Duration::from_secs(100));
        assert_eq!(config.quorums, vec![QuorumSpec::default()]);
        assert_eq!(config.ecdsa_private_key, "0xdeadbeef");
    }

    #[test]
    fn cli_bind_address_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
eth_rpc_url: "http://localhost:8545"
eth_ws_url: "ws://localhost:8546"
rpc_bind_address: "127.0.0.1:9090"
metrics_bind_address: "127.0.0.1:9091"
avs_service_manager_address: "0x0000000000000000000000000000000000000001"
registry_coordinator_address: "0x0000000000000000000000000000000000000002"
operator_state_retriever_address: "0x0000000000000000000000000000000000000003"
"#,
        )
        .unwrap();

        let mut overrides = cli(path.to_str().unwrap());
        overrides.rpc_bind_address = Some("0.0.0.0:7000".parse().unwrap());

        let config = AggregatorConfig::load(&path, &overrides).unwrap();
        assert_eq!(config.rpc_bind_address, "0.0.0.0:7000".parse().unwrap());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = AggregatorConfig::load(Path::new("/nonexistent/config.yaml"), &cli("x"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn missing_ecdsa_private_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
eth_rpc_url: "http://localhost:8545"
eth_ws_url: "ws://localhost:8546"
rpc_bind_address: "127.0.0.1:9090"
metrics_bind_address: "127.0.0.1:9091"
avs_service_manager_address: "0x0000000000000000000000000000000000000001"
registry_coordinator_address: "0x0000000000000000000000000000000000000002"
operator_state_retriever_address: "0x0000000000000000000000000000000000000003"
"#,
        )
        .unwrap();

        let mut overrides = cli(path.to_str().unwrap());
        overrides.ecdsa_private_key = None;
        let result = AggregatorConfig::load(&path, &overrides);
        assert!(matches!(result, Err(ConfigError::MissingValue("ecdsa_private_key"))));

        overrides.ecdsa_private_key = Some(String::new());
        let result = AggregatorConfig::load(&path, &overrides);
        assert!(matches!(result, Err(ConfigError::MissingValue("ecdsa_private_key"))));
    }
}
