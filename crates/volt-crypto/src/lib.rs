//! # volt-crypto
//!
//! Cryptographic primitives for the volt payment-channel node.
//!
//! - Keccak-256 hashing
//! - ECDSA signing over secp256k1 with public-key recovery
//! - Address derivation from public keys
//!
//! Channel state messages are authenticated by recovering the signer's
//! address from the signature and comparing it to the expected party, so
//! no standalone public keys travel on the wire.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod signature;

pub use error::CryptoError;
pub use hash::keccak256;
pub use signature::{
    public_key_to_address, recover_signer, sign, verify_signer, PrivateKey, PublicKey, Signature,
};
