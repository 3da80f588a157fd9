//! Wire and domain types shared across the aggregator core.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

/// 32-byte Merkle root identifying a batch. The registry's primary key.
pub type BatchRoot = B256;

/// 32-byte operator identifier, matching the on-chain operator id encoding.
pub type OperatorId = B256;

/// A numbered quorum and the stake percentage it must reach before the
/// aggregator considers the quorum satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumSpec {
    pub quorum_number: u8,
    pub threshold_percent: u8,
}

impl Default for QuorumSpec {
    /// The shipped configuration default: 67% of stake in quorum 0.
    fn default() -> Self {
        Self {
            quorum_number: 0,
            threshold_percent: 67,
        }
    }
}

/// Per-quorum stake snapshot taken at a task's reference block.
#[derive(Debug, Clone, Default)]
pub struct QuorumStakeSnapshot {
    pub operator_stakes: std::collections::HashMap<OperatorId, u64>,
    pub total_stake: u64,
}

/// An operator's signed attestation for a batch, as received over the RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTaskResponse {
    pub root: BatchRoot,
    /// Whether the operator's verification of the batch succeeded.
    pub proof_verified: bool,
    /// Additional response metadata included in the digest preimage.
    #[serde(with = "hex_bytes")]
    pub metadata: Vec<u8>,
    pub operator_id: OperatorId,
    /// BN254 G1 signature, compressed encoding.
    #[serde(with = "hex_bytes")]
    pub signature_g1: Vec<u8>,
    /// BN254 G2 public key, compressed encoding.
    #[serde(with = "hex_bytes")]
    pub public_key_g2: Vec<u8>,
}

/// A `NewBatch` event as delivered by the chain adapter's subscription.
#[derive(Debug, Clone)]
pub struct NewBatchEvent {
    pub root: BatchRoot,
    pub created_block: u32,
    pub transaction_hash: Option<B256>,
}

/// A batch record as resolved by a catch-up read against the chain.
#[derive(Debug, Clone, Copy)]
pub struct BatchInfo {
    pub root: BatchRoot,
    pub created_block: u32,
}

/// BN254 G1 point in the `{x, y}` coordinate encoding the on-chain verifier expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct G1Point {
    pub x: U256,
    pub y: U256,
}

/// BN254 G2 point; each coordinate is an `Fp2` element represented as `[c0, c1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct G2Point {
    pub x: [U256; 2],
    pub y: [U256; 2],
}

/// The on-chain submission payload, assembled by the coordinator from an
/// [`crate::aggregation::AggregatedResponse`] and submitted via
/// [`crate::chain::ChainAdapter::submit`].
///
/// Public keys are BN254 G2 points and the aggregated signature is a BN254
/// G1 point, matching `blueprint_crypto_bn254`'s `ArkBlsBn254Public`/
/// `ArkBlsBn254Signature` key assignment (the distilled spec's field naming
/// used "G1" for every point; this crate follows the crypto library it
/// actually depends on instead — see DESIGN.md).
#[derive(Debug, Clone)]
pub struct NonSignerStakesAndSignature {
    pub non_signer_pubkeys: Vec<G2Point>,
    pub quorum_apks: Vec<G2Point>,
    pub apk_g2: G2Point,
    pub sigma: G1Point,
    pub non_signer_quorum_bitmap_indices: Vec<u32>,
    pub quorum_apk_indices: Vec<u32>,
    pub total_stake_indices: Vec<u32>,
    pub non_signer_stake_indices: Vec<u32>,
}

/// Receipt returned by a successful [`crate::chain::ChainAdapter::submit`] call.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
}

/// Hex encoding/decoding for byte arrays in JSON, `0x`-prefixed.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
