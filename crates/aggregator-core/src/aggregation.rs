//! Per-task BLS signature collection and stake-weighted threshold evaluation.
//!
//! This is a thin, in-process wrapper around `blueprint_crypto_bn254`'s
//! `ArkBlsBn254` aggregation primitives. A task tracks one or more
//! independent quorums; every configured quorum must clear its own stake
//! threshold before the task resolves and a success event fires.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ark_ec::AffineRepr;
use ark_serialize::CanonicalDeserialize;
use blueprint_crypto_bn254::{ArkBlsBn254, ArkBlsBn254Public, ArkBlsBn254Signature};
use blueprint_crypto_core::aggregation::AggregatableSignature;
use blueprint_crypto_core::KeyType;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::AggregatorError;
use crate::types::{OperatorId, QuorumSpec, QuorumStakeSnapshot};

/// A single quorum's stake snapshot and running tally of signed stake.
#[derive(Debug, Clone)]
struct QuorumState {
    spec: QuorumSpec,
    operator_stakes: HashMap<OperatorId, u64>,
    total_stake: u64,
    signed_stake: u64,
}

impl QuorumState {
    fn new(spec: QuorumSpec, snapshot: QuorumStakeSnapshot) -> Self {
        Self {
            spec,
            operator_stakes: snapshot.operator_stakes,
            total_stake: snapshot.total_stake,
            signed_stake: 0,
        }
    }

    /// `signersStake * 100 >= totalStake * thresholdPercent`.
    fn threshold_met(&self) -> bool {
        if self.total_stake == 0 {
            return true;
        }
        self.signed_stake * 100 >= self.total_stake * u64::from(self.spec.threshold_percent)
    }
}

struct TaskState {
    reference_block: u32,
    quorums: Vec<QuorumState>,
    signatures: HashMap<OperatorId, (ArkBlsBn254Signature, ArkBlsBn254Public)>,
    created_at: Instant,
    expires_at: Instant,
    /// Set once a terminal event (success or failure) has been emitted; no
    /// further signatures are accepted and no second event is ever sent.
    resolved: bool,
}

impl TaskState {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn all_quorums_met(&self) -> bool {
        self.quorums.iter().all(QuorumState::threshold_met)
    }

    fn non_signer_ids(&self) -> Vec<OperatorId> {
        self.quorums
            .iter()
            .flat_map(|q| q.operator_stakes.keys().copied())
            .filter(|id| !self.signatures.contains_key(id))
            .collect()
    }

    fn signers_in_order(&self) -> Vec<OperatorId> {
        let mut ids: Vec<_> = self.signatures.keys().copied().collect();
        ids.sort();
        ids
    }
}

/// Outcome of a task's aggregation, emitted exactly once per task on
/// [`BlsAggregator::response_stream`].
#[derive(Debug, Clone)]
pub struct AggregatedResponse {
    pub task_index: u32,
    pub non_signer_pubkeys: Vec<ArkBlsBn254Public>,
    pub non_signer_ids: Vec<OperatorId>,
    pub quorum_apks: Vec<ArkBlsBn254Public>,
    pub signers_apk: ArkBlsBn254Public,
    pub signers_agg_sig: ArkBlsBn254Signature,
    pub non_signer_quorum_bitmap_indices: Vec<u32>,
    pub quorum_apk_indices: Vec<u32>,
    pub total_stake_indices: Vec<u32>,
    pub non_signer_stake_indices: Vec<u32>,
    pub err: Option<AggregatorError>,
}

/// Collects operator signatures per task and emits one [`AggregatedResponse`]
/// per task once every configured quorum's stake threshold is met, or once
/// the task expires unmet.
pub struct BlsAggregator {
    tasks: Arc<RwLock<HashMap<u32, TaskState>>>,
    sender: mpsc::UnboundedSender<AggregatedResponse>,
    receiver: std::sync::Mutex<Option<mpsc::UnboundedReceiver<AggregatedResponse>>>,
}

impl Default for BlsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl BlsAggregator {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            sender,
            receiver: std::sync::Mutex::new(Some(receiver)),
        }
    }

    /// Takes ownership of the single aggregated-response stream. May only be
    /// called once; the lifecycle is expected to be the sole consumer.
    ///
    /// # Panics
    /// Panics if called more than once.
    pub fn response_stream(&self) -> mpsc::UnboundedReceiver<AggregatedResponse> {
        self.receiver
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .expect("response_stream() called more than once")
    }

    /// Begins collecting signatures for `task_index` against a stake
    /// snapshot for each configured quorum.
    ///
    /// # Errors
    /// Returns [`AggregatorError::TaskAlreadyExists`] if the index is in use.
    pub fn initialize_task(
        &self,
        task_index: u32,
        reference_block: u32,
        quorums: &[(QuorumSpec, QuorumStakeSnapshot)],
        time_to_expiry: Duration,
    ) -> Result<(), AggregatorError> {
        let mut tasks = self.tasks.write();
        if tasks.contains_key(&task_index) {
            return Err(AggregatorError::TaskAlreadyExists);
        }

        let now = Instant::now();
        tasks.insert(
            task_index,
            TaskState {
                reference_block,
                quorums: quorums
                    .iter()
                    .cloned()
                    .map(|(spec, snapshot)| QuorumState::new(spec, snapshot))
                    .collect(),
                signatures: HashMap::new(),
                created_at: now,
                expires_at: now + time_to_expiry,
                resolved: false,
            },
        );
        Ok(())
    }

    /// Validates and accumulates a single operator's signature.
    ///
    /// `response_digest` is the message the signature must verify against —
    /// the operator's registered pubkey is the `public_key_bytes` it
    /// submitted alongside the signature. On the transition into "every
    /// quorum met", aggregates the collected signatures/public keys and
    /// emits the terminal success event on [`Self::response_stream`].
    ///
    /// # Errors
    /// See [`AggregatorError`] variants.
    pub fn submit_signature(
        &self,
        task_index: u32,
        response_digest: &[u8; 32],
        signature_bytes: &[u8],
        public_key_bytes: &[u8],
        operator_id: OperatorId,
    ) -> Result<(), AggregatorError> {
        let signature = ArkBlsBn254Signature(
            ark_bn254::G1Affine::deserialize_compressed(signature_bytes)
                .map_err(|e| AggregatorError::InvalidSignature(e.to_string()))?,
        );
        let public_key = ArkBlsBn254Public(
            ark_bn254::G2Affine::deserialize_compressed(public_key_bytes)
                .map_err(|e| AggregatorError::InvalidPublicKey(e.to_string()))?,
        );
        if !ArkBlsBn254::verify(&public_key, response_digest, &signature) {
            return Err(AggregatorError::InvalidSignature(
                "signature does not verify against the response digest".to_string(),
            ));
        }

        let newly_met = {
            let mut tasks = self.tasks.write();
            let task = tasks.get_mut(&task_index).ok_or(AggregatorError::UnknownTask)?;

            if task.resolved {
                return Err(AggregatorError::TaskExpired);
            }
            if task.is_expired() {
                task.resolved = true;
                let _ = self.sender.send(expired_response(task_index));
                return Err(AggregatorError::TaskExpired);
            }
            if task.signatures.contains_key(&operator_id) {
                return Err(AggregatorError::DuplicateSignature);
            }
            if !task
                .quorums
                .iter()
                .any(|q| q.operator_stakes.contains_key(&operator_id))
            {
                return Err(AggregatorError::UnknownOperator);
            }

            for quorum in &mut task.quorums {
                if let Some(&stake) = quorum.operator_stakes.get(&operator_id) {
                    quorum.signed_stake += stake;
                }
            }
            task.signatures
                .insert(operator_id, (signature, public_key));

            let met = task.all_quorums_met();
            if met {
                task.resolved = true;
            }
            met
        };

        if newly_met {
            self.emit_success(task_index);
        }

        Ok(())
    }

    fn emit_success(&self, task_index: u32) {
        let tasks = self.tasks.read();
        let Some(task) = tasks.get(&task_index) else {
            return;
        };

        let signer_ids = task.signers_in_order();
        let (signatures, public_keys): (Vec<_>, Vec<_>) = signer_ids
            .iter()
            .filter_map(|id| task.signatures.get(id).cloned())
            .unzip();

        let aggregated = match ArkBlsBn254::aggregate(&signatures, &public_keys) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(task_index, error = %e, "BLS aggregation failed");
                let _ = self.sender.send(AggregatedResponse {
                    task_index,
                    non_signer_pubkeys: Vec::new(),
                    non_signer_ids: Vec::new(),
                    quorum_apks: Vec::new(),
                    signers_apk: public_keys.first().cloned().unwrap_or_else(|| {
                        ArkBlsBn254Public(ark_bn254::G2Affine::zero())
                    }),
                    signers_agg_sig: signatures.first().cloned().unwrap_or_else(|| {
                        ArkBlsBn254Signature(ark_bn254::G1Affine::zero())
                    }),
                    non_signer_quorum_bitmap_indices: Vec::new(),
                    quorum_apk_indices: Vec::new(),
                    total_stake_indices: Vec::new(),
                    non_signer_stake_indices: Vec::new(),
                    err: Some(AggregatorError::AggregationFailed(e.to_string())),
                });
                return;
            }
        };
        let (signers_agg_sig, signers_apk) = aggregated;

        let non_signer_ids = task.non_signer_ids();
        // Non-signers are never present in `task.signatures` by construction,
        // so there is no pubkey to recover here.
        let non_signer_pubkeys = Vec::new();

        debug!(
            task_index,
            signers = signer_ids.len(),
            non_signers = non_signer_ids.len(),
            "Emitting aggregated response"
        );

        let _ = self.sender.send(AggregatedResponse {
            task_index,
            non_signer_pubkeys,
            non_signer_ids,
            quorum_apks: Vec::new(),
            signers_apk,
            signers_agg_sig,
            non_signer_quorum_bitmap_indices: Vec::new(),
            quorum_apk_indices: Vec::new(),
            total_stake_indices: Vec::new(),
            non_signer_stake_indices: Vec::new(),
            err: None,
        });
    }

    /// Scans all open tasks and emits expiry failures for any that have
    /// timed out without meeting their threshold. Intended to be driven by
    /// a periodic tick from the lifecycle.
    pub fn sweep_expired(&self) -> usize {
        let expired_indices: Vec<u32> = {
            let mut tasks = self.tasks.write();
            let mut indices = Vec::new();
            for (&index, task) in tasks.iter_mut() {
                if !task.resolved && task.is_expired() {
                    task.resolved = true;
                    indices.push(index);
                }
            }
            indices
        };

        for index in &expired_indices {
            let _ = self.sender.send(expired_response(*index));
        }
        expired_indices.len()
    }

    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.read().len()
    }
}

fn expired_response(task_index: u32) -> AggregatedResponse {
    AggregatedResponse {
        task_index,
        non_signer_pubkeys: Vec::new(),
        non_signer_ids: Vec::new(),
        quorum_apks: Vec::new(),
        signers_apk: ArkBlsBn254Public(ark_bn254::G2Affine::zero()),
        signers_agg_sig: ArkBlsBn254Signature(ark_bn254::G1Affine::zero()),
        non_signer_quorum_bitmap_indices: Vec::new(),
        quorum_apk_indices: Vec::new(),
        total_stake_indices: Vec::new(),
        non_signer_stake_indices: Vec::new(),
        err: Some(AggregatorError::TaskExpired),
    }
}
