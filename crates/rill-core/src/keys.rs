//! Chunk-key derivation for the update scheme.
//!
//! Any client that knows a resource name can compute the key of every
//! possible update without consulting a directory:
//!
//! ```text
//! root key   = namehash(name)
//! update key = Keccak-256(period_le32 ‖ version_le32 ‖ namehash)
//! digest     = Keccak-256(update_key ‖ data)        (signing digest)
//! ```
//!
//! Each derivation uses a fresh hasher, so concurrent callers never contend.

use crate::crypto::keccak::{keccak256, Keccak256Hasher};
use crate::identifiers::{ChunkKey, Digest, Namehash};

/// Computes the default namehash: Keccak-256 of the raw name bytes.
///
/// A configured validator may supply a different canonical namehash (for
/// example a domain namehash); this is the fallback when none is present.
pub fn raw_name_hash(name: &str) -> Namehash {
    Namehash(keccak256(name.as_bytes()))
}

/// Computes the key of the update chunk for `(period, version, namehash)`.
///
/// Period and version are encoded little-endian, 4 bytes each.
pub fn update_key(period: u32, version: u32, name_hash: &Namehash) -> ChunkKey {
    let mut hasher = Keccak256Hasher::new();
    hasher.update(&period.to_le_bytes());
    hasher.update(&version.to_le_bytes());
    hasher.update(name_hash.as_slice());
    ChunkKey(hasher.finalize())
}

/// Computes the signing digest for an update: Keccak-256(key ‖ data).
pub fn key_data_digest(key: &ChunkKey, data: &[u8]) -> Digest {
    let mut hasher = Keccak256Hasher::new();
    hasher.update(key.as_slice());
    hasher.update(data);
    Digest(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_key_layout() {
        let name_hash = raw_name_hash("foo.bar");

        // period = 2, version = 1 must hash exactly
        // 02 00 00 00 ‖ 01 00 00 00 ‖ namehash
        let mut preimage = Vec::with_capacity(40);
        preimage.extend_from_slice(&[0x02, 0x00, 0x00, 0x00]);
        preimage.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
        preimage.extend_from_slice(name_hash.as_slice());

        let key = update_key(2, 1, &name_hash);
        assert_eq!(key.as_bytes(), &keccak256(&preimage));
    }

    #[test]
    fn test_update_key_distinct_per_triple() {
        let h1 = raw_name_hash("foo.bar");
        let h2 = raw_name_hash("foo.baz");

        let base = update_key(1, 1, &h1);
        assert_ne!(base, update_key(2, 1, &h1));
        assert_ne!(base, update_key(1, 2, &h1));
        assert_ne!(base, update_key(1, 1, &h2));
    }

    #[test]
    fn test_key_data_digest_layout() {
        let key = ChunkKey::new([0x11; 32]);
        let data = b"hello";

        let mut preimage = Vec::new();
        preimage.extend_from_slice(key.as_slice());
        preimage.extend_from_slice(data);

        let digest = key_data_digest(&key, data);
        assert_eq!(digest.as_bytes(), &keccak256(&preimage));
    }

    #[test]
    fn test_raw_name_hash_is_keccak_of_bytes() {
        assert_eq!(
            raw_name_hash("foo.bar").as_bytes(),
            &keccak256(b"foo.bar")
        );
    }
}
