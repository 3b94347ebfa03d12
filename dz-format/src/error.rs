//! Error types for DZ metadata parsing and chunk codecs

use thiserror::Error;

/// Result type for format-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// DZ format error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// First four bytes are not `DTRZ`
    #[error("Invalid DZ magic: expected [68, 84, 82, 90], got {0:?}")]
    BadMagic([u8; 4]),

    /// Version byte differs from 0
    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u8),

    /// A metadata table extends past the end of the main volume
    #[error("Truncated archive: needed {expected} bytes, had {actual}")]
    Truncated { expected: u64, actual: u64 },

    /// A chunk's compression bits are zero or name several algorithms
    #[error("Chunk {0} has zero or conflicting compression flags")]
    BadChunkFlags(u16),

    /// The chunk uses a codec this crate detects but does not decode
    #[error("Chunk {chunk} uses an unsupported codec (flags {flags:#06x})")]
    UnsupportedCodec { chunk: u16, flags: u16 },

    /// The underlying codec rejected the chunk payload
    #[error("Codec failure on chunk {chunk}: {reason}")]
    CodecFailure { chunk: u16, reason: String },

    /// Decompressed output does not match the recorded length
    #[error("Chunk {chunk} decompressed to {got} bytes, expected {expected}")]
    SizeMismatch { chunk: u16, expected: u64, got: u64 },

    /// A string table entry is not valid UTF-8
    #[error("Invalid string table entry at byte {offset}")]
    InvalidString { offset: u64 },
}
