//! BLS signature aggregation for decentralized proof-verification batches.
//!
//! Operators independently verify a batch off-chain and submit a signed
//! attestation; this crate collects those attestations, aggregates them
//! once every configured quorum clears its stake threshold, and hands the
//! aggregated result to a chain adapter for on-chain submission.
//!
//! ## Architecture
//!
//! ```text
//! Chain adapter ──NewBatch──▶ AggregationCoordinator ──▶ BatchRegistry
//!                                     │
//! Operator 1 ──┐                     │
//! Operator 2 ──┼──POST /v1/submit────┤
//! Operator 3 ──┘                     ▼
//!                              BlsAggregator ──AggregatedResponse──▶ ChainAdapter::submit
//! ```
//!
//! ### Operator flow
//!
//! 1. The chain adapter observes a `NewBatch` event (or a submission
//!    catches one up via a lookup read) and the coordinator initializes an
//!    aggregation task against a stake snapshot for every configured quorum.
//! 2. Each operator verifies the batch, signs a digest over the result, and
//!    POSTs it to `/v1/submit`.
//! 3. Once every quorum's stake threshold is met, the aggregator emits a
//!    terminal response; the coordinator converts it into the on-chain
//!    payload shape and submits it.
//! 4. A periodic sweep resolves tasks that never reached threshold before
//!    expiring.

pub mod aggregation;
pub mod chain;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod registry;
pub mod rpc;
pub mod types;

pub use aggregation::{AggregatedResponse, BlsAggregator};
pub use chain::{ChainAdapter, MockChainAdapter};
pub use config::{AggregatorConfig, Cli};
pub use coordinator::{AggregationCoordinator, AggregationPolicy, response_digest};
pub use error::{AggregatorError, ChainError, ConfigError, FatalError, RegistryError, SubmitError};
pub use lifecycle::Lifecycle;
pub use metrics::{Metrics, MetricsServer};
pub use registry::BatchRegistry;
pub use types::{
    BatchInfo, BatchRoot, G1Point, G2Point, NewBatchEvent, NonSignerStakesAndSignature,
    OperatorId, QuorumSpec, QuorumStakeSnapshot, SignedTaskResponse, TxReceipt,
};
