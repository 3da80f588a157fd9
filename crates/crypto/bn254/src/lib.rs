//! BN254 BLS signatures: public keys on G2, signatures on G1.
//!
//! This is the "minimal signature size" BLS variant used by EigenLayer-style
//! operator sets: a signature is a single G1 point, so it is cheap to gossip
//! and cheap to aggregate, at the cost of a slightly larger (G2) public key.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod aggregation;
pub mod error;

use ark_bn254::{Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{AffineRepr, CurveGroup, pairing::Pairing};
use ark_ff::{Field, PrimeField, UniformRand};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::rand::rngs::OsRng;
use blueprint_crypto_core::{KeyType, KeyTypeId};
use blueprint_std::string::{String, ToString};
use blueprint_std::vec::Vec;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use error::Bn254Error;

/// The BN254 BLS signature scheme: [`KeyType::Public`] lives on G2,
/// [`KeyType::Signature`] lives on G1.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArkBlsBn254;

/// A BLS secret scalar. Zeroized on drop.
#[derive(Clone)]
pub struct ArkBlsBn254Secret(pub Fr);

impl Zeroize for ArkBlsBn254Secret {
    fn zeroize(&mut self) {
        self.0 = Fr::from(0u64);
    }
}

impl Drop for ArkBlsBn254Secret {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// A BLS public key on G2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArkBlsBn254Public(pub G2Affine);

/// A BLS signature on G1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArkBlsBn254Signature(pub G1Affine);

fn serialize_affine<S, P>(point: &P, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    P: CanonicalSerialize,
{
    let mut bytes = Vec::new();
    point
        .serialize_compressed(&mut bytes)
        .map_err(|e| serde::ser::Error::custom(e.to_string()))?;
    serde_bytes::Bytes::new(&bytes).serialize(serializer)
}

fn deserialize_affine<'de, D, P>(deserializer: D) -> Result<P, D::Error>
where
    D: Deserializer<'de>,
    P: CanonicalDeserialize,
{
    let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
    P::deserialize_compressed(bytes.as_slice()).map_err(D::Error::custom)
}

impl Serialize for ArkBlsBn254Public {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_affine(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for ArkBlsBn254Public {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_affine(deserializer).map(ArkBlsBn254Public)
    }
}

impl Serialize for ArkBlsBn254Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_affine(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for ArkBlsBn254Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_affine(deserializer).map(ArkBlsBn254Signature)
    }
}

/// Hashes `msg` onto the G1 curve via try-and-increment, the classic
/// constant-ish-time BLS hash-to-curve fallback used when a proper SWU map
/// isn't wired up for the curve in question.
fn hash_to_g1(msg: &[u8]) -> G1Affine {
    let mut counter: u32 = 0;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(b"blueprint-aggregator-bls-bn254-g1");
        hasher.update(msg);
        hasher.update(counter.to_be_bytes());
        let digest = hasher.finalize();

        if let Some(x) = <G1Affine as AffineRepr>::BaseField::from_random_bytes(&digest) {
            if let Some(point) = G1Affine::get_point_from_x_unchecked(x, false) {
                // BN254's G1 cofactor is 1: any point on the curve is in the
                // prime-order subgroup already.
                return point;
            }
        }

        counter = counter.wrapping_add(1);
    }
}

impl KeyType for ArkBlsBn254 {
    type Public = ArkBlsBn254Public;
    type Secret = ArkBlsBn254Secret;
    type Signature = ArkBlsBn254Signature;
    type Error = Bn254Error;

    fn key_type_id() -> KeyTypeId {
        KeyTypeId::Bn254
    }

    fn generate_with_seed(seed: Option<&[u8]>) -> Result<Self::Secret, Self::Error> {
        let scalar = match seed {
            Some(seed) => {
                if seed.is_empty() {
                    return Err(Bn254Error::InvalidSeed("seed must not be empty".to_string()));
                }
                let digest = Sha256::digest(seed);
                Fr::from_le_bytes_mod_order(&digest)
            }
            None => Fr::rand(&mut OsRng),
        };

        if scalar == Fr::from(0u64) {
            return Err(Bn254Error::InvalidSeed(
                "seed produced a zero scalar".to_string(),
            ));
        }

        Ok(ArkBlsBn254Secret(scalar))
    }

    fn generate_with_string(secret: String) -> Result<Self::Secret, Self::Error> {
        let bytes = hex::decode(secret.trim_start_matches("0x"))
            .map_err(|e| Bn254Error::InvalidSeed(e.to_string()))?;
        Self::generate_with_seed(Some(&bytes))
    }

    fn public_from_secret(secret: &Self::Secret) -> Self::Public {
        let point: G2Projective = G2Affine::generator() * secret.0;
        ArkBlsBn254Public(point.into_affine())
    }

    fn sign_with_secret(secret: &mut Self::Secret, msg: &[u8]) -> Result<Self::Signature, Self::Error> {
        let hashed = hash_to_g1(msg);
        let signature: G1Projective = hashed * secret.0;
        Ok(ArkBlsBn254Signature(signature.into_affine()))
    }

    fn sign_with_secret_pre_hashed(
        secret: &mut Self::Secret,
        msg: &[u8; 32],
    ) -> Result<Self::Signature, Self::Error> {
        Self::sign_with_secret(secret, msg)
    }

    fn verify(public: &Self::Public, msg: &[u8], signature: &Self::Signature) -> bool {
        let hashed = hash_to_g1(msg);
        let lhs = ark_bn254::Bn254::pairing(signature.0, G2Affine::generator());
        let rhs = ark_bn254::Bn254::pairing(hashed, public.0);
        lhs == rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let mut secret = ArkBlsBn254::generate_with_seed(Some(b"unit-test-seed")).unwrap();
        let public = ArkBlsBn254::public_from_secret(&secret);
        let signature = ArkBlsBn254::sign_with_secret(&mut secret, b"hello aggregator").unwrap();

        assert!(ArkBlsBn254::verify(&public, b"hello aggregator", &signature));
        assert!(!ArkBlsBn254::verify(&public, b"different message", &signature));
    }

    #[test]
    fn sign_with_secret_pre_hashed_matches_sign_with_secret_on_the_digest() {
        let mut secret = ArkBlsBn254::generate_with_seed(Some(b"pre-hashed-seed")).unwrap();
        let public = ArkBlsBn254::public_from_secret(&secret);
        let digest = blueprint_crypto_hashing::keccak_256(b"batch root || proof_verified || metadata");

        let signature = ArkBlsBn254::sign_with_secret_pre_hashed(&mut secret, &digest).unwrap();
        assert!(ArkBlsBn254::verify(&public, &digest, &signature));
    }

    #[test]
    fn generate_with_seed_is_deterministic() {
        let a = ArkBlsBn254::generate_with_seed(Some(b"same-seed")).unwrap();
        let b = ArkBlsBn254::generate_with_seed(Some(b"same-seed")).unwrap();
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn empty_seed_is_rejected() {
        assert!(ArkBlsBn254::generate_with_seed(Some(b"")).is_err());
    }

    #[test]
    fn public_key_round_trips_through_serde() {
        let secret = ArkBlsBn254::generate_with_seed(Some(b"serde-seed")).unwrap();
        let public = ArkBlsBn254::public_from_secret(&secret);

        let encoded = serde_json::to_vec(&public).unwrap();
        let decoded: ArkBlsBn254Public = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded.0, public.0);
    }

    #[test]
    fn signature_round_trips_through_serde() {
        let mut secret = ArkBlsBn254::generate_with_seed(Some(b"serde-seed-2")).unwrap();
        let signature = ArkBlsBn254::sign_with_secret(&mut secret, b"payload").unwrap();

        let encoded = serde_json::to_vec(&signature).unwrap();
        let decoded: ArkBlsBn254Signature = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded.0, signature.0);
    }
}
