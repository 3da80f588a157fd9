//! The chain-facing boundary: batch event subscription, catch-up lookups,
//! and aggregated-response submission.
//!
//! An explicit trait so the core never depends on a concrete transport. A
//! live implementation (contract bindings, an RPC provider, a signer) is
//! out of scope for this crate; [`MockChainAdapter`] exists so the
//! coordinator and lifecycle are exercisable end-to-end in tests and in the
//! example binary.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::ChainError;
use crate::types::{
    BatchInfo, BatchRoot, NewBatchEvent, NonSignerStakesAndSignature, QuorumSpec,
    QuorumStakeSnapshot, TxReceipt,
};

/// Obligations an on-chain integration must satisfy for the coordinator to
/// drive it.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Hands back the receiving half of a restartable batch-event stream.
    /// May only be called once; the lifecycle is the sole consumer.
    fn subscribe_new_batches(&self) -> mpsc::UnboundedReceiver<Result<NewBatchEvent, ChainError>>;

    /// Synchronous catch-up read for a batch missed by the subscription.
    async fn lookup_batch(&self, root: BatchRoot) -> Result<Option<BatchInfo>, ChainError>;

    /// Reads the operator stake distribution for `quorum` as of
    /// `reference_block`, used to seed a new task's threshold arithmetic.
    async fn quorum_stake_snapshot(
        &self,
        quorum: QuorumSpec,
        reference_block: u32,
    ) -> Result<QuorumStakeSnapshot, ChainError>;

    /// Submits the aggregated-response transaction, returning only once it
    /// has been included (or definitively failed).
    async fn submit(
        &self,
        root: BatchRoot,
        payload: NonSignerStakesAndSignature,
    ) -> Result<TxReceipt, ChainError>;
}

/// An in-memory [`ChainAdapter`] driven entirely by test/example code: batch
/// events are injected via [`MockChainAdapter::push_new_batch`], lookups
/// answer from a fixed backing map, and submissions succeed or fail
/// according to a configurable toggle.
pub struct MockChainAdapter {
    event_sender: mpsc::UnboundedSender<Result<NewBatchEvent, ChainError>>,
    event_receiver: Mutex<Option<mpsc::UnboundedReceiver<Result<NewBatchEvent, ChainError>>>>,
    known_batches: Mutex<std::collections::HashMap<BatchRoot, BatchInfo>>,
    stake_snapshots: Mutex<std::collections::HashMap<u8, QuorumStakeSnapshot>>,
    submissions: Mutex<VecDeque<(BatchRoot, NonSignerStakesAndSignature)>>,
    fail_submissions: std::sync::atomic::AtomicBool,
}

impl MockChainAdapter {
    #[must_use]
    pub fn new() -> Arc<Self> {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        Arc::new(Self {
            event_sender,
            event_receiver: Mutex::new(Some(event_receiver)),
            known_batches: Mutex::new(std::collections::HashMap::new()),
            stake_snapshots: Mutex::new(std::collections::HashMap::new()),
            submissions: Mutex::new(VecDeque::new()),
            fail_submissions: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Sets the stake snapshot returned for a given quorum number by every
    /// subsequent [`ChainAdapter::quorum_stake_snapshot`] call.
    pub fn set_quorum_stake(&self, quorum_number: u8, snapshot: QuorumStakeSnapshot) {
        self.stake_snapshots.lock().insert(quorum_number, snapshot);
    }

    /// Injects a `NewBatch` event as if the subscription had observed it.
    pub fn push_new_batch(&self, root: BatchRoot, created_block: u32) {
        self.known_batches
            .lock()
            .insert(root, BatchInfo { root, created_block });
        let _ = self.event_sender.send(Ok(NewBatchEvent {
            root,
            created_block,
            transaction_hash: None,
        }));
    }

    /// Registers a batch as chain-known without emitting a subscription
    /// event, simulating one that was missed and must be caught up via
    /// [`ChainAdapter::lookup_batch`].
    pub fn seed_lookup_only(&self, root: BatchRoot, created_block: u32) {
        self.known_batches
            .lock()
            .insert(root, BatchInfo { root, created_block });
    }

    pub fn fail_next_submissions(&self, fail: bool) {
        self.fail_submissions
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    #[must_use]
    pub fn submissions(&self) -> Vec<BatchRoot> {
        self.submissions.lock().iter().map(|(root, _)| *root).collect()
    }
}

#[async_trait]
impl ChainAdapter for MockChainAdapter {
    fn subscribe_new_batches(&self) -> mpsc::UnboundedReceiver<Result<NewBatchEvent, ChainError>> {
        self.event_receiver
            .lock()
            .take()
            .expect("subscribe_new_batches() called more than once")
    }

    async fn lookup_batch(&self, root: BatchRoot) -> Result<Option<BatchInfo>, ChainError> {
        Ok(self.known_batches.lock().get(&root).copied())
    }

    async fn quorum_stake_snapshot(
        &self,
        quorum: QuorumSpec,
        _reference_block: u32,
    ) -> Result<QuorumStakeSnapshot, ChainError> {
        Ok(self
            .stake_snapshots
            .lock()
            .get(&quorum.quorum_number)
            .cloned()
            .unwrap_or_default())
    }

    async fn submit(
        &self,
        root: BatchRoot,
        payload: NonSignerStakesAndSignature,
    ) -> Result<TxReceipt, ChainError> {
        if self
            .fail_submissions
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(ChainError::Submit("mock submission failure".to_string()));
        }
        self.submissions.lock().push_back((root, payload));
        Ok(TxReceipt {
            transaction_hash: root,
            block_number: 0,
        })
    }
}
