//! Key-type abstraction shared across the Tangle Blueprints crypto backends.
//!
//! A [`KeyType`] names one signature scheme (BN254 BLS, k256 ECDSA, ...) along
//! with its public/secret/signature types and the operations over them.
//! [`aggregation::AggregatableSignature`] extends it for schemes that support
//! non-interactive signature aggregation, such as BLS.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod aggregation;

use core::fmt::{Debug, Display};

use serde::{Serialize, de::DeserializeOwned};

/// Identifies which signature scheme a [`KeyType`] implementation backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum KeyTypeId {
    #[cfg(feature = "bn254")]
    Bn254,
    #[cfg(feature = "k256")]
    Ecdsa,
    #[cfg(feature = "sr25519-schnorrkel")]
    Sr25519,
    #[cfg(feature = "zebra")]
    Ed25519,
    #[cfg(feature = "bls")]
    Bls381,
}

/// A signature scheme: its key/signature types and the operations over them.
pub trait KeyType: Sized + Send + Sync + 'static {
    type Public: Clone + Debug + Serialize + DeserializeOwned + Send + Sync;
    type Secret: Clone + Send + Sync;
    type Signature: Clone + Debug + Serialize + DeserializeOwned + Send + Sync;
    type Error: Debug + Display + Send + Sync + 'static;

    fn key_type_id() -> KeyTypeId;

    /// Derives a secret deterministically from `seed`, or from OS randomness
    /// when `seed` is `None`.
    ///
    /// # Errors
    /// Returns `Self::Error` if `seed` is present but not a valid input for
    /// this scheme.
    fn generate_with_seed(seed: Option<&[u8]>) -> Result<Self::Secret, Self::Error>;

    /// Parses a secret from its canonical string encoding.
    ///
    /// # Errors
    /// Returns `Self::Error` if `secret` is not a valid encoding for this
    /// scheme.
    fn generate_with_string(secret: blueprint_std::string::String) -> Result<Self::Secret, Self::Error>;

    fn public_from_secret(secret: &Self::Secret) -> Self::Public;

    /// # Errors
    /// Returns `Self::Error` if signing fails.
    fn sign_with_secret(secret: &mut Self::Secret, msg: &[u8]) -> Result<Self::Signature, Self::Error>;

    /// Signs a pre-hashed, fixed-size digest rather than an arbitrary message.
    ///
    /// # Errors
    /// Returns `Self::Error` if signing fails.
    fn sign_with_secret_pre_hashed(
        secret: &mut Self::Secret,
        msg: &[u8; 32],
    ) -> Result<Self::Signature, Self::Error>;

    fn verify(public: &Self::Public, msg: &[u8], signature: &Self::Signature) -> bool;
}
