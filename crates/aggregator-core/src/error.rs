//! Error taxonomy for the aggregator core.

use thiserror::Error;

/// Errors produced by [`crate::registry::BatchRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("batch already registered")]
    AlreadyExists,
    #[error("batch not registered")]
    UnknownBatch,
}

/// Errors produced by [`crate::aggregation::BlsAggregator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    #[error("task not found")]
    UnknownTask,
    #[error("task already initialized")]
    TaskAlreadyExists,
    #[error("task has expired")]
    TaskExpired,
    #[error("operator is not part of any configured quorum for this task")]
    UnknownOperator,
    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),
    #[error("invalid public key encoding: {0}")]
    InvalidPublicKey(String),
    #[error("operator already submitted a signature for this task")]
    DuplicateSignature,
    #[error("aggregation failed: {0}")]
    AggregationFailed(String),
}

/// Errors surfaced by the [`crate::chain::ChainAdapter`] boundary.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("chain subscription terminated: {0}")]
    Subscription(String),
    #[error("batch lookup failed: {0}")]
    Lookup(String),
    #[error("on-chain submission failed: {0}")]
    Submit(String),
}

/// Errors returned to an operator from the RPC ingress path.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("unknown batch")]
    UnknownBatch,
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
}

/// Configuration loading/validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("missing required configuration value: {0}")]
    MissingValue(&'static str),
}

/// Fatal errors that terminate the process, per the lifecycle's escalation policy.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("RPC server error: {0}")]
    RpcServer(String),
    #[error("metrics server error: {0}")]
    MetricsServer(String),
    #[error(transparent)]
    ChainSubscription(ChainError),
    #[error("aggregator refused to initialize task {task_index}: {source}")]
    InitializeTask {
        task_index: u32,
        #[source]
        source: AggregatorError,
    },
}
