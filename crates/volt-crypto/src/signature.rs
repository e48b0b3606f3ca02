//! ECDSA signatures with signer recovery (secp256k1)

use crate::{keccak256, CryptoError};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use volt_primitives::{Address, H256};

/// Private key (32 bytes)
pub type PrivateKey = SigningKey;

/// Public key
pub type PublicKey = VerifyingKey;

/// ECDSA signature in Ethereum r || s || v form
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// r component (32 bytes)
    pub r: [u8; 32],
    /// s component (32 bytes)
    pub s: [u8; 32],
    /// recovery id, stored as 27 or 28
    pub v: u8,
}

impl Signature {
    /// Create a signature from its components
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Signature { r, s, v }
    }

    /// Recovery id (0 or 1)
    pub fn recovery_id(&self) -> u8 {
        if self.v >= 27 {
            self.v - 27
        } else {
            self.v
        }
    }

    /// Serialize as 65 bytes (r || s || v)
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// Parse from a 65-byte representation
    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Signature { r, s, v: bytes[64] }
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature(0x{}, v={})", hex::encode(self.to_bytes()), self.v)
    }
}

/// Sign a message digest, producing a low-s recoverable signature
pub fn sign(digest: &H256, key: &PrivateKey) -> Result<Signature, CryptoError> {
    let (sig, recovery_id) = key
        .sign_prehash_recoverable(digest.as_bytes())
        .map_err(|e| CryptoError::Signing(e.to_string()))?;

    // Replacing s with n - s flips the recovered point's y parity
    let (sig, recovery_id) = match sig.normalize_s() {
        Some(normalized) => {
            let flipped = RecoveryId::from_byte(recovery_id.to_byte() ^ 1)
                .ok_or_else(|| CryptoError::Signing("recovery id out of range".into()))?;
            (normalized, flipped)
        }
        None => (sig, recovery_id),
    };

    Ok(Signature {
        r: sig.r().to_bytes().into(),
        s: sig.s().to_bytes().into(),
        v: recovery_id.to_byte() + 27,
    })
}

/// Recover the address that produced a signature over a digest
pub fn recover_signer(digest: &H256, signature: &Signature) -> Result<Address, CryptoError> {
    let r: k256::FieldBytes = signature.r.into();
    let s: k256::FieldBytes = signature.s.into();
    let sig = EcdsaSignature::from_scalars(r, s)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    // Only canonical low-s signatures are accepted
    if sig.normalize_s().is_some() {
        return Err(CryptoError::InvalidSignature("high-s signature".into()));
    }

    let recovery_id = RecoveryId::try_from(signature.recovery_id())
        .map_err(|_| CryptoError::InvalidRecoveryId(signature.v))?;

    let key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id)
        .map_err(|e| CryptoError::Recovery(e.to_string()))?;

    Ok(public_key_to_address(&key))
}

/// Check a signature over a digest against an expected signer address
pub fn verify_signer(digest: &H256, signature: &Signature, signer: &Address) -> bool {
    matches!(recover_signer(digest, signature), Ok(recovered) if recovered == *signer)
}

/// Derive an Ethereum-style address from a public key
pub fn public_key_to_address(key: &PublicKey) -> Address {
    // keccak256 of the uncompressed point without the 0x04 tag, last 20 bytes
    let encoded = key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}
