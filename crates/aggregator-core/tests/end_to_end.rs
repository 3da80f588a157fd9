//! End-to-end scenarios driving the full coordinator/aggregator/registry
//! stack against a [`MockChainAdapter`], without any network I/O.

use std::sync::Arc;
use std::time::Duration;

use ark_serialize::CanonicalSerialize;
use blueprint_crypto_bn254::ArkBlsBn254;
use blueprint_crypto_core::KeyType;

use blueprint_aggregator_core::{
    AggregationCoordinator, AggregationPolicy, BatchRegistry, BatchRoot, BlsAggregator,
    MockChainAdapter, Metrics, OperatorId, QuorumSpec, QuorumStakeSnapshot, SignedTaskResponse,
    response_digest,
};

fn root(byte: u8) -> BatchRoot {
    BatchRoot::repeat_byte(byte)
}

fn operator(byte: u8) -> OperatorId {
    OperatorId::repeat_byte(byte)
}

fn stakes(pairs: &[(u8, u64)]) -> std::collections::HashMap<OperatorId, u64> {
    pairs.iter().map(|&(id, s)| (operator(id), s)).collect()
}

struct Harness {
    coordinator: AggregationCoordinator,
    chain: Arc<MockChainAdapter>,
    aggregator: Arc<BlsAggregator>,
}

fn harness(quorum: QuorumSpec, operator_stakes: &[(u8, u64)]) -> Harness {
    let registry = BatchRegistry::new();
    let aggregator = Arc::new(BlsAggregator::new());
    let chain = MockChainAdapter::new();
    let total_stake = operator_stakes.iter().map(|&(_, s)| s).sum();
    chain.set_quorum_stake(
        quorum.quorum_number,
        QuorumStakeSnapshot {
            operator_stakes: stakes(operator_stakes),
            total_stake,
        },
    );
    let metrics = Arc::new(Metrics::new());
    let policy = AggregationPolicy {
        quorums: vec![quorum],
        time_to_expiry: Duration::from_secs(100),
    };
    let coordinator = AggregationCoordinator::new(
        registry,
        aggregator.clone(),
        chain.clone(),
        metrics,
        policy,
    );
    Harness {
        coordinator,
        chain,
        aggregator,
    }
}

/// Builds a response signed by a keypair derived from `operator_id`, over
/// the digest the coordinator will actually recompute on receipt.
fn signed(root: BatchRoot, operator_id: OperatorId) -> SignedTaskResponse {
    let mut response = SignedTaskResponse {
        root,
        proof_verified: true,
        metadata: vec![0xAA],
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

#[tokio::test]
async fn happy_path_batch_accumulates_signatures_without_submitting() {
    let quorum = QuorumSpec {
        quorum_number: 0,
        threshold_percent: 67,
    };
    let harness = harness(quorum, &[(1, 40), (2, 30), (3, 30)]);
    let r = root(0x01);

    harness.coordinator.on_new_batch(r, 10).await;

    harness
        .coordinator
        .on_submit(signed(r, operator(1)))
        .await
        .unwrap();
    harness
        .coordinator
        .on_submit(signed(r, operator(2)))
        .await
        .unwrap();

    assert_eq!(harness.chain.submissions(), Vec::<BatchRoot>::new());
    assert_eq!(harness.coordinator.registry().is_submitted(r), Some(false));
}

#[tokio::test]
async fn batch_reaching_threshold_submits_once_the_aggregated_response_is_consumed() {
    let quorum = QuorumSpec {
        quorum_number: 0,
        threshold_percent: 67,
    };
    let harness = harness(quorum, &[(1, 40), (2, 30), (3, 30)]);
    let r = root(0x08);
    let mut responses = harness.aggregator.response_stream();

    harness.coordinator.on_new_batch(r, 10).await;
    harness
        .coordinator
        .on_submit(signed(r, operator(1)))
        .await
        .unwrap();
    harness
        .coordinator
        .on_submit(signed(r, operator(2)))
        .await
        .unwrap();

    let response = responses.try_recv().expect("threshold was met by operators 1 and 2");
    assert!(response.err.is_none());

    harness.coordinator.on_aggregated(response).await;

    assert_eq!(harness.chain.submissions(), vec![r]);
    assert_eq!(harness.coordinator.registry().is_submitted(r), Some(true));
}

#[tokio::test]
async fn operator_submits_before_batch_is_known_via_chain_catchup() {
    let quorum = QuorumSpec {
        quorum_number: 0,
        threshold_percent: 51,
    };
    let harness = harness(quorum, &[(1, 100)]);
    let r = root(0x02);
    harness.chain.seed_lookup_only(r, 5);

    let result = harness.coordinator.on_submit(signed(r, operator(1))).await;
    assert!(result.is_ok());
    assert!(harness.coordinator.registry().index_of(r).is_some());
}

#[tokio::test]
async fn submission_for_entirely_unknown_batch_is_rejected() {
    let quorum = QuorumSpec::default();
    let harness = harness(quorum, &[(1, 100)]);
    let r = root(0x03);

    let result = harness.coordinator.on_submit(signed(r, operator(1))).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn duplicate_signature_from_same_operator_is_rejected() {
    let quorum = QuorumSpec {
        quorum_number: 0,
        threshold_percent: 100,
    };
    let harness = harness(quorum, &[(1, 50), (2, 50)]);
    let r = root(0x04);
    harness.coordinator.on_new_batch(r, 1).await;

    harness
        .coordinator
        .on_submit(signed(r, operator(1)))
        .await
        .unwrap();
    let result = harness.coordinator.on_submit(signed(r, operator(1))).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn duplicate_new_batch_event_does_not_reset_the_task() {
    let quorum = QuorumSpec {
        quorum_number: 0,
        threshold_percent: 100,
    };
    let harness = harness(quorum, &[(1, 100)]);
    let r = root(0x05);

    harness.coordinator.on_new_batch(r, 1).await;
    harness
        .coordinator
        .on_submit(signed(r, operator(1)))
        .await
        .unwrap();
    // A stray duplicate event must not re-initialize (and thus reset) the task.
    harness.coordinator.on_new_batch(r, 1).await;

    assert_eq!(harness.coordinator.registry().response_count(r), 1);
}

#[tokio::test]
async fn multiple_batches_are_tracked_independently() {
    let quorum = QuorumSpec {
        quorum_number: 0,
        threshold_percent: 100,
    };
    let harness = harness(quorum, &[(1, 100)]);
    let r1 = root(0x06);
    let r2 = root(0x07);

    harness.coordinator.on_new_batch(r1, 1).await;
    harness.coordinator.on_new_batch(r2, 2).await;

    harness
        .coordinator
        .on_submit(signed(r1, operator(1)))
        .await
        .unwrap();

    assert_eq!(harness.coordinator.registry().response_count(r1), 1);
    assert_eq!(harness.coordinator.registry().response_count(r2), 0);
}
