//! Crypto error types

use thiserror::Error;

/// Cryptographic operation errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Signing failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// Malformed or non-canonical signature
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Recovery id outside the accepted 27/28 range
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// Public key recovery failed
    #[error("signer recovery failed: {0}")]
    Recovery(String),
}
