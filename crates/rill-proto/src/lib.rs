//! Rill Protocol - Persistent chunk formats.
//!
//! This crate defines the two byte layouts of the update scheme:
//! - The 16-byte root entry (start block ‖ update frequency)
//! - The variable-length update chunk (lengths, period, version, name,
//!   data, optional signature)
//!
//! Both layouts are little-endian and byte-exact: interoperability with the
//! existing corpus of chunks depends on them.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod root;
pub mod update;

pub use root::{RootEntry, ROOT_ENTRY_SIZE};
pub use update::{max_data_len, UpdateChunk, MAX_CHUNK_PAYLOAD};

use thiserror::Error;

/// Error decoding or encoding a chunk payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload shorter than its fixed fields
    #[error("Chunk too small: expected at least {expected} bytes, got {actual}")]
    TooSmall {
        /// Minimum length required
        expected: usize,
        /// Actual payload length
        actual: usize,
    },

    /// Root entry payload is not exactly 16 bytes
    #[error("Invalid root entry length {actual}, should be {expected}")]
    RootLength {
        /// Required root entry length
        expected: usize,
        /// Actual payload length
        actual: usize,
    },

    /// Header length field smaller than the fixed period/version fields
    #[error("Header length {0} shorter than the fixed period and version fields")]
    HeaderTooShort(u16),

    /// Reported lengths exceed the actual payload
    #[error(
        "Reported header length {header} + data length {data} longer than actual chunk length {actual}"
    )]
    LengthMismatch {
        /// Header length field value
        header: u16,
        /// Data length field value
        data: u16,
        /// Actual payload length
        actual: usize,
    },

    /// Signature expected but the trailing bytes are short
    #[error("Signature truncated: {actual} trailing bytes, need {expected}")]
    SignatureTruncated {
        /// Signature length required
        expected: usize,
        /// Trailing bytes present
        actual: usize,
    },

    /// Name does not fit the 16-bit header length field
    #[error("Name of {0} bytes does not fit the header length field")]
    NameTooLong(usize),

    /// Data does not fit the 16-bit data length field
    #[error("Data of {0} bytes does not fit the data length field")]
    DataTooLong(usize),

    /// Encoded payload would exceed the chunk capacity
    #[error("Encoded chunk of {size} bytes exceeds the {max} byte capacity")]
    ChunkOverflow {
        /// Encoded size
        size: usize,
        /// Maximum payload size
        max: usize,
    },

    /// Name bytes are not valid UTF-8
    #[error("Name bytes are not valid UTF-8")]
    NameNotUtf8,
}
