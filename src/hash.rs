use sha3::{Digest, Keccak256 as KeccakHasher};

/// Hash function used to derive selectors and event topics.
///
/// Chains may be configured with a non-Keccak hash; implement this trait to plug one in.
pub trait SignatureHasher: Send + Sync {
    fn hash(&self, data: &[u8]) -> [u8; 32];

    /// First 4 bytes of the signature hash.
    fn selector(&self, signature: &str) -> [u8; 4] {
        let hash = self.hash(signature.as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// Full signature hash, used as the first topic of non-anonymous events.
    fn topic(&self, signature: &str) -> [u8; 32] {
        self.hash(signature.as_bytes())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256;

impl SignatureHasher for Keccak256 {
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        let digest = KeccakHasher::digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

/// Calculate the 4-byte function selector from a method signature using Keccak-256
pub fn calculate_selector(signature: &str) -> [u8; 4] {
    Keccak256.selector(signature)
}
