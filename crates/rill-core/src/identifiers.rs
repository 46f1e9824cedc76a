//! Identifier types for the update scheme.
//!
//! Defines the 32-byte identifiers that address chunks and digests:
//! - `Namehash` - canonical hash of a resource name; keys the root chunk
//! - `ChunkKey` - Keccak-256(period ‖ version ‖ namehash); keys an update chunk
//! - `Digest` - a 32-byte signing digest
//!
//! plus the 20-byte `Address` of a recovered signer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Macro to define a 32-byte identifier type with common implementations.
macro_rules! define_id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Creates a new identifier from a 32-byte array.
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Creates a zero identifier.
            pub const fn zero() -> Self {
                Self([0u8; 32])
            }

            /// Returns the inner bytes.
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Returns the inner bytes as a slice.
            pub fn as_slice(&self) -> &[u8] {
                &self.0
            }

            /// Creates from a byte slice; the slice must be exactly 32 bytes.
            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                if bytes.len() != 32 {
                    return None;
                }
                let mut arr = [0u8; 32];
                arr.copy_from_slice(bytes);
                Some(Self(arr))
            }

            /// Creates from a hex string.
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let bytes = hex::decode(s)?;
                if bytes.len() != 32 {
                    return Err(hex::FromHexError::InvalidStringLength);
                }
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&bytes);
                Ok(Self(arr))
            }

            /// Returns as a hex string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..16])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", &self.to_hex()[..16])
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl From<$name> for [u8; 32] {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

define_id_type!(
    /// Canonical hash of a resource name.
    ///
    /// Keys the 16-byte root chunk. Computed by the configured validator's
    /// namehash when validation is enabled, otherwise Keccak-256 of the raw
    /// name bytes.
    Namehash
);

define_id_type!(
    /// Key of an update chunk: Keccak-256(period_le32 ‖ version_le32 ‖ namehash).
    ///
    /// Derivable by any client that knows the resource name, so updates can
    /// be located without a directory or naming-system record.
    ChunkKey
);

define_id_type!(
    /// A 32-byte signing digest, e.g. Keccak-256(key ‖ data) for an update.
    Digest
);

impl From<Namehash> for ChunkKey {
    fn from(hash: Namehash) -> Self {
        Self(hash.0)
    }
}

/// Address of a signer recovered from a signature, 20 bytes.
///
/// Derived as the trailing 20 bytes of Keccak-256 of the uncompressed
/// secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Creates a new address from a 20-byte array.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the inner bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns as a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_roundtrip() {
        let hex_str = "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";
        let id = Namehash::from_hex(hex_str).unwrap();
        assert_eq!(id.to_hex(), hex_str);
    }

    #[test]
    fn test_from_hex_wrong_length() {
        assert!(Namehash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_from_slice() {
        let bytes = [7u8; 32];
        let key = ChunkKey::from_slice(&bytes).unwrap();
        assert_eq!(key.as_bytes(), &bytes);
        assert!(ChunkKey::from_slice(&bytes[..31]).is_none());
    }

    #[test]
    fn test_namehash_as_chunk_key() {
        let hash = Namehash::new([0x11; 32]);
        let key: ChunkKey = hash.into();
        assert_eq!(key.as_bytes(), hash.as_bytes());
    }

    #[test]
    fn test_display_truncates() {
        let id = Digest::new([0xAB; 32]);
        assert_eq!(format!("{}", id), "abababababababab");
    }
}
