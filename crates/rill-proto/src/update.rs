//! Update chunk format.
//!
//! An update chunk carries one resource update and is keyed by
//! Keccak-256(period ‖ version ‖ namehash). Period, version and name are
//! embedded so a retrieved chunk can be checked against the resource it
//! claims to update, and so reverse lookups need no side table.
//!
//! ```text
//! ┌───────────┬────────────┬────────────┬─────────────┬──────────────────┬─────────────┬────────────────────┐
//! │ hdr_len   │ data_len   │ period     │ version     │ name             │ data        │ signature          │
//! │ u16 LE    │ u16 LE     │ u32 LE     │ u32 LE      │ hdr_len-8 bytes  │ data_len    │ 0 or 65 bytes      │
//! └───────────┴────────────┴────────────┴─────────────┴──────────────────┴─────────────┴────────────────────┘
//! ```
//!
//! `hdr_len` covers period, version and name only, not the two length
//! prefixes. The signature is present iff validation is enabled. The whole
//! payload fits in one chunk: at most 4096 bytes.

use rill_core::crypto::{Signature, SIGNATURE_LENGTH};

use crate::CodecError;

/// Maximum size in bytes of a chunk payload; an update cannot span chunks.
pub const MAX_CHUNK_PAYLOAD: usize = 4096;

/// Bytes of the two length prefixes preceding the header.
const LENGTH_PREFIXES: usize = 4;

/// Fixed bytes inside the header: period and version.
const HEADER_FIXED: usize = 8;

/// Maximum data length for an update with the given name.
///
/// `4096 - (sig_len + name_len + 12)`, where 12 covers the two length
/// prefixes, the period and the version.
pub fn max_data_len(name_len: usize, validated: bool) -> usize {
    let sig_len = if validated { SIGNATURE_LENGTH } else { 0 };
    MAX_CHUNK_PAYLOAD.saturating_sub(sig_len + name_len + LENGTH_PREFIXES + HEADER_FIXED)
}

/// A decoded (or to-be-encoded) update chunk payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateChunk {
    /// Update period, starting at 1.
    pub period: u32,
    /// Version within the period, starting at 1.
    pub version: u32,
    /// Resource name the update belongs to.
    pub name: String,
    /// Update payload bytes.
    pub data: Vec<u8>,
    /// Recoverable signature over Keccak-256(key ‖ data); present iff
    /// validation is enabled.
    pub signature: Option<Signature>,
}

impl UpdateChunk {
    /// Creates a new update chunk.
    pub fn new(
        period: u32,
        version: u32,
        name: impl Into<String>,
        data: Vec<u8>,
        signature: Option<Signature>,
    ) -> Self {
        Self {
            period,
            version,
            name: name.into(),
            data,
            signature,
        }
    }

    /// Serializes to the chunk payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let name_len = self.name.len();
        let header_len = name_len + HEADER_FIXED;
        if header_len > u16::MAX as usize {
            return Err(CodecError::NameTooLong(name_len));
        }
        if self.data.len() > u16::MAX as usize {
            return Err(CodecError::DataTooLong(self.data.len()));
        }

        let sig_len = self.signature.map_or(0, |_| SIGNATURE_LENGTH);
        let total = LENGTH_PREFIXES + header_len + self.data.len() + sig_len;
        if total > MAX_CHUNK_PAYLOAD {
            return Err(CodecError::ChunkOverflow {
                size: total,
                max: MAX_CHUNK_PAYLOAD,
            });
        }

        let mut bytes = Vec::with_capacity(total);
        bytes.extend_from_slice(&(header_len as u16).to_le_bytes());
        bytes.extend_from_slice(&(self.data.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&self.period.to_le_bytes());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(self.name.as_bytes());
        bytes.extend_from_slice(&self.data);
        if let Some(signature) = &self.signature {
            bytes.extend_from_slice(signature.as_ref());
        }

        Ok(bytes)
    }

    /// Deserializes from a chunk payload.
    ///
    /// `validated` selects whether a trailing 65-byte signature is required;
    /// the layout itself does not flag its presence. The name length is
    /// derived from the header length field, which must cover at least the
    /// period and version fields.
    pub fn from_bytes(bytes: &[u8], validated: bool) -> Result<Self, CodecError> {
        if bytes.len() < LENGTH_PREFIXES {
            return Err(CodecError::TooSmall {
                expected: LENGTH_PREFIXES,
                actual: bytes.len(),
            });
        }

        let header_len = u16::from_le_bytes([bytes[0], bytes[1]]);
        let data_len = u16::from_le_bytes([bytes[2], bytes[3]]);

        if (header_len as usize) < HEADER_FIXED {
            return Err(CodecError::HeaderTooShort(header_len));
        }
        if header_len as usize + data_len as usize + LENGTH_PREFIXES > bytes.len() {
            return Err(CodecError::LengthMismatch {
                header: header_len,
                data: data_len,
                actual: bytes.len(),
            });
        }

        let mut cursor = LENGTH_PREFIXES;
        let period = read_u32_le(bytes, cursor);
        cursor += 4;
        let version = read_u32_le(bytes, cursor);
        cursor += 4;

        let name_len = header_len as usize - HEADER_FIXED;
        let name = std::str::from_utf8(&bytes[cursor..cursor + name_len])
            .map_err(|_| CodecError::NameNotUtf8)?
            .to_string();
        cursor += name_len;

        let data = bytes[cursor..cursor + data_len as usize].to_vec();
        cursor += data_len as usize;

        let signature = if validated {
            let trailing = bytes.len() - cursor;
            if trailing < SIGNATURE_LENGTH {
                return Err(CodecError::SignatureTruncated {
                    expected: SIGNATURE_LENGTH,
                    actual: trailing,
                });
            }
            Signature::from_slice(&bytes[cursor..cursor + SIGNATURE_LENGTH])
        } else {
            None
        };

        Ok(Self {
            period,
            version,
            name,
            data,
            signature,
        })
    }
}

fn read_u32_le(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
