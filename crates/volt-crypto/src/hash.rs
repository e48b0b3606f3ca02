//! Keccak-256 hashing

use sha3::{Digest, Keccak256};
use volt_primitives::H256;

/// Compute the Keccak-256 hash of the input data
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    H256::from_bytes(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty() {
        // keccak256("")
        assert_eq!(
            keccak256(&[]).to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak256_hello() {
        // keccak256("hello")
        assert_eq!(
            keccak256(b"hello").to_hex(),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_keccak256_deterministic() {
        let data = b"channel state digest input";
        assert_eq!(keccak256(data), keccak256(data));
        assert_ne!(keccak256(data), keccak256(b"something else"));
    }

    #[test]
    fn test_keccak256_avalanche() {
        let h1 = keccak256(&[0x00]);
        let h2 = keccak256(&[0x01]);
        let differing = h1
            .as_bytes()
            .iter()
            .zip(h2.as_bytes())
            .filter(|(a, b)| a != b)
            .count();
        assert!(differing > 20, "only {} bytes differ", differing);
    }
}
