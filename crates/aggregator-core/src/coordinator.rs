//! Central orchestration wiring the registry, the BLS aggregator, the chain
//! adapter, and metrics together behind three entry points: new-batch
//! registration, operator submission, and aggregated-response handling.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::keccak256;
use tracing::{debug, info, warn};

use crate::aggregation::{AggregatedResponse, BlsAggregator};
use crate::chain::ChainAdapter;
use crate::error::SubmitError;
use crate::metrics::Metrics;
use crate::registry::BatchRegistry;
use crate::types::{
    BatchRoot, G1Point, G2Point, NonSignerStakesAndSignature, QuorumSpec, SignedTaskResponse,
};

/// Quorums and expiry duration the coordinator applies to every new task.
#[derive(Debug, Clone)]
pub struct AggregationPolicy {
    pub quorums: Vec<QuorumSpec>,
    pub time_to_expiry: Duration,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            quorums: vec![QuorumSpec::default()],
            time_to_expiry: Duration::from_secs(100),
        }
    }
}

/// Computes the deterministic digest an operator signs over:
/// `root || proof_verified || keccak256(metadata)`.
#[must_use]
pub fn response_digest(response: &SignedTaskResponse) -> [u8; 32] {
    let metadata_hash = keccak256(&response.metadata);
    let mut preimage = Vec::with_capacity(32 + 1 + 32);
    preimage.extend_from_slice(response.root.as_slice());
    preimage.push(u8::from(response.proof_verified));
    preimage.extend_from_slice(metadata_hash.as_slice());
    *keccak256(preimage)
}

pub struct AggregationCoordinator {
    registry: BatchRegistry,
    aggregator: Arc<BlsAggregator>,
    chain: Arc<dyn ChainAdapter>,
    metrics: Arc<Metrics>,
    policy: AggregationPolicy,
}

impl AggregationCoordinator {
    #[must_use]
    pub fn new(
        registry: BatchRegistry,
        aggregator: Arc<BlsAggregator>,
        chain: Arc<dyn ChainAdapter>,
        metrics: Arc<Metrics>,
        policy: AggregationPolicy,
    ) -> Self {
        Self {
            registry,
            aggregator,
            chain,
            metrics,
            policy,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &BatchRegistry {
        &self.registry
    }

    /// Handles a `NewBatch` event: registers the batch and initializes its
    /// BLS aggregation task. Duplicate events are logged and ignored.
    pub async fn on_new_batch(&self, root: BatchRoot, created_block: u32) {
        let index = match self.registry.add(root, created_block) {
            Ok(index) => index,
            Err(_already_exists) => {
                warn!(root = %root, "duplicate NewBatch event, ignoring");
                return;
            }
        };

        let mut quorum_snapshots = Vec::with_capacity(self.policy.quorums.len());
        for &quorum in &self.policy.quorums {
            match self
                .chain
                .quorum_stake_snapshot(quorum, created_block)
                .await
            {
                Ok(snapshot) => quorum_snapshots.push((quorum, snapshot)),
                Err(e) => {
                    warn!(root = %root, error = %e, "failed to read quorum stake snapshot");
                    return;
                }
            }
        }

        if let Err(e) = self.aggregator.initialize_task(
            index,
            created_block,
            &quorum_snapshots,
            self.policy.time_to_expiry,
        ) {
            warn!(root = %root, index, error = %e, "failed to initialize aggregation task");
        }
    }

    /// Handles an operator's signed submission. Resolves an unseen root via
    /// a chain catch-up read before forwarding to the aggregator.
    ///
    /// # Errors
    /// Returns [`SubmitError::UnknownBatch`] if the root is unknown both
    /// locally and on-chain, or [`SubmitError::Aggregator`] if the BLS layer
    /// rejects the signature. The registry append is never rolled back.
    pub async fn on_submit(&self, signed: SignedTaskResponse) -> Result<(), SubmitError> {
        let root = signed.root;

        if self.registry.index_of(root).is_none() {
            match self.chain.lookup_batch(root).await {
                Ok(Some(info)) => self.on_new_batch(info.root, info.created_block).await,
                Ok(None) | Err(_) => return Err(SubmitError::UnknownBatch),
            }
        }

        let Some(index) = self.registry.index_of(root) else {
            return Err(SubmitError::UnknownBatch);
        };

        let digest = response_digest(&signed);
        debug!(root = %root, digest = %hex::encode(digest), "computed response digest");

        let operator_id = signed.operator_id;
        let signature_g1 = signed.signature_g1.clone();
        let public_key_g2 = signed.public_key_g2.clone();

        // Append is observational: a rejected signature still leaves a
        // record of the attempt, and a duplicate is caught at the BLS layer.
        let _ = self.registry.append_response(root, signed);

        self.aggregator
            .submit_signature(index, &digest, &signature_g1, &public_key_g2, operator_id)
            .map_err(SubmitError::Aggregator)?;

        Ok(())
    }

    /// Handles a terminal event from the BLS aggregator: converts it into
    /// the on-chain payload and submits, or logs and drops on failure.
    pub async fn on_aggregated(&self, response: AggregatedResponse) {
        if let Some(err) = &response.err {
            warn!(task_index = response.task_index, error = %err, "aggregation did not complete");
            self.metrics.record_aggregation_error();
            return;
        }

        let Some(root) = self.registry.root_of(response.task_index) else {
            warn!(
                task_index = response.task_index,
                "aggregated response for unknown task index; invariant violated"
            );
            self.metrics.record_aggregation_error();
            return;
        };

        let payload = convert_to_payload(&response);

        match self.chain.submit(root, payload).await {
            Ok(receipt) => {
                if let Err(e) = self.registry.mark_submitted(root) {
                    warn!(root = %root, error = %e, "failed to mark batch submitted after successful tx");
                }
                self.metrics.record_aggregated_response();
                info!(
                    root = %root,
                    tx_hash = %receipt.transaction_hash,
                    "submitted aggregated response on-chain"
                );
            }
            Err(e) => {
                warn!(root = %root, error = %e, "on-chain submission failed; not marking submitted");
                self.metrics.record_aggregation_error();
            }
        }
    }
}

/// Converts an [`AggregatedResponse`] into the on-chain submission payload.
/// The index arrays (`non_signer_quorum_bitmap_indices`, `quorum_apk_indices`,
/// `total_stake_indices`, `non_signer_stake_indices`) are passed through
/// verbatim: they index into on-chain history snapshots this crate does not
/// interpret.
fn convert_to_payload(response: &AggregatedResponse) -> NonSignerStakesAndSignature {
    NonSignerStakesAndSignature {
        non_signer_pubkeys: response
            .non_signer_pubkeys
            .iter()
            .map(ark_g2_to_point)
            .collect(),
        quorum_apks: response.quorum_apks.iter().map(ark_g2_to_point).collect(),
        apk_g2: ark_g2_to_point(&response.signers_apk),
        sigma: ark_g1_to_point(&response.signers_agg_sig),
        non_signer_quorum_bitmap_indices: response.non_signer_quorum_bitmap_indices.clone(),
        quorum_apk_indices: response.quorum_apk_indices.clone(),
        total_stake_indices: response.total_stake_indices.clone(),
        non_signer_stake_indices: response.non_signer_stake_indices.clone(),
    }
}

fn ark_g1_to_point(sig: &blueprint_crypto_bn254::ArkBlsBn254Signature) -> G1Point {
    let (x, y) = affine_xy(&sig.0);
    G1Point { x, y }
}

fn ark_g2_to_point(pk: &blueprint_crypto_bn254::ArkBlsBn254Public) -> G2Point {
    use ark_ff::Fp2;
    let Fp2 { c0, c1 } = pk.0.x;
    let x = [fq_to_u256(c0), fq_to_u256(c1)];
    let Fp2 { c0, c1 } = pk.0.y;
    let y = [fq_to_u256(c0), fq_to_u256(c1)];
    G2Point { x, y }
}

fn affine_xy(point: &ark_bn254::G1Affine) -> (alloy_primitives::U256, alloy_primitives::U256) {
    (fq_to_u256(point.x), fq_to_u256(point.y))
}

fn fq_to_u256(value: ark_bn254::Fq) -> alloy_primitives::U256 {
    use ark_ff::PrimeField;
    let bytes = value.into_bigint().to_bytes_be();
    alloy_primitives::U256::from_be_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainAdapter;
    use crate::types::QuorumStakeSnapshot;

    fn root(byte: u8) -> BatchRoot {
        BatchRoot::repeat_byte(byte)
    }

    fn operator(byte: u8) -> BatchRoot {
        BatchRoot::repeat_byte(byte)
    }

    /// Builds a response signed by a keypair derived from `operator_id`,
    /// over the digest `response_digest` would actually compute for it — so
    /// it verifies through `BlsAggregator::submit_signature` like a real
    /// operator submission would.
    fn signed_response(root: BatchRoot, operator_id: BatchRoot) -> SignedTaskResponse {
        use ark_serialize::CanonicalSerialize;
        use blueprint_crypto_bn254::ArkBlsBn254;
        use blueprint_crypto_core::KeyType;

        let mut response = SignedTaskResponse {
            root,
            proof_verified: true,
            metadata: vec![1, 2, 3],
            operator_id,
            signature_g1: Vec::new(),
            public_key_g2: Vec::new(),
        };
        let digest = response_digest(&response);

        let mut secret = ArkBlsBn254::generate_with_seed(Some(operator_id.as_slice())).unwrap();
        let public = ArkBlsBn254::public_from_secret(&secret);
        let signature = ArkBlsBn254::sign_with_secret_pre_hashed(&mut secret, &digest).unwrap();

        let mut sig = Vec::new();
        signature.0.serialize_compressed(&mut sig).unwrap();
        let mut pk = Vec::new();
        public.0.serialize_compressed(&mut pk).unwrap();

        response.signature_g1 = sig;
        response.public_key_g2 = pk;
        response
    }

    fn setup(
        quorum_stakes: &[(u8, u64)],
    ) -> (AggregationCoordinator, Arc<MockChainAdapter>) {
        let registry = BatchRegistry::new();
        let aggregator = Arc::new(BlsAggregator::new());
        let chain = MockChainAdapter::new();
        for &(id, stake) in quorum_stakes {
            let mut stakes = std::collections::HashMap::new();
            stakes.insert(operator(id), stake);
            chain.set_quorum_stake(
                0,
                QuorumStakeSnapshot {
                    operator_stakes: stakes,
                    total_stake: stake,
                },
            );
        }
        let metrics = Arc::new(Metrics::new());
        let policy = AggregationPolicy {
            quorums: vec![QuorumSpec {
                quorum_number: 0,
                threshold_percent: 67,
            }],
            time_to_expiry: Duration::from_secs(100),
        };
        let coordinator =
            AggregationCoordinator::new(registry, aggregator, chain.clone(), metrics, policy);
        (coordinator, chain)
    }

    #[tokio::test]
    async fn unknown_batch_with_no_chain_record_is_rejected() {
        let (coordinator, _chain) = setup(&[(1, 100)]);
        let result = coordinator
            .on_submit(signed_response(root(0xAB), operator(1)))
            .await;
        assert!(matches!(result, Err(SubmitError::UnknownBatch)));
        assert!(coordinator.registry().index_of(root(0xAB)).is_none());
    }

    #[tokio::test]
    async fn unknown_batch_catches_up_from_chain() {
        let (coordinator, chain) = setup(&[(1, 100)]);
        let r = root(0xAB);
        chain.seed_lookup_only(r, 42);

        let result = coordinator.on_submit(signed_response(r, operator(1))).await;
        assert!(result.is_ok());
        assert_eq!(coordinator.registry().index_of(r), Some(0));
        assert_eq!(coordinator.registry().created_block_of(r), Some(42));
    }

    #[tokio::test]
    async fn duplicate_new_batch_event_is_ignored() {
        let (coordinator, _chain) = setup(&[(1, 100)]);
        let r = root(0x11);
        coordinator.on_new_batch(r, 100).await;
        coordinator.on_new_batch(r, 999).await;

        // Second call must not have overwritten the first registration.
        assert_eq!(coordinator.registry().created_block_of(r), Some(100));
    }

    #[test]
    fn response_digest_is_deterministic_and_sensitive_to_inputs() {
        let a = signed_response(root(0x11), operator(1));
        let mut b = a.clone();
        b.metadata = vec![9, 9, 9];

        assert_eq!(response_digest(&a), response_digest(&a));
        assert_ne!(response_digest(&a), response_digest(&b));
    }
}
