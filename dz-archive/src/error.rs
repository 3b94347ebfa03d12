//! Error types for archive engine operations

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// What an index violation was about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptKind {
    /// Archive stores no user files
    EmptyArchive,
    /// Mapping stream references a chunk past the chunk table
    ChunkIndex,
    /// Mapping stream references a directory past the directory list
    DirectoryIndex,
    /// Files sharing a chunk are not adjacent, or the sharing shape is
    /// not representable
    SharedChunkRange,
    /// Consumer lengths of a shared chunk do not add up to its
    /// decompressed length
    SharedChunkLength,
    /// Shared-chunk boundaries cannot be derived without per-file
    /// lengths, and none were supplied
    SharedChunkUnderdetermined,
    /// A supplied file length disagrees with the resolved tables
    FileLength,
    /// A chunk's extent does not resolve inside its volume
    ChunkExtent,
}

impl fmt::Display for CorruptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EmptyArchive => "empty archive",
            Self::ChunkIndex => "chunk index out of range",
            Self::DirectoryIndex => "directory index out of range",
            Self::SharedChunkRange => "invalid shared-chunk range",
            Self::SharedChunkLength => "shared-chunk length mismatch",
            Self::SharedChunkUnderdetermined => "shared-chunk boundaries underdetermined",
            Self::FileLength => "file length mismatch",
            Self::ChunkExtent => "chunk extent outside volume",
        };
        f.write_str(s)
    }
}

/// Archive engine error types
#[derive(Error, Debug)]
pub enum Error {
    /// Format-level parse, serialize or codec error
    #[error("Format error: {0}")]
    Format(#[from] dz_format::Error),

    /// An index table violates the archive invariants
    #[error("Corrupt index ({kind}), offender {offender}")]
    CorruptIndex { kind: CorruptKind, offender: u32 },

    /// A logical path escapes the extraction root
    #[error("Path traversal rejected: {0:?}")]
    PathTraversal(String),

    /// A referenced volume is not present in the source or sink
    #[error("Volume {0} missing")]
    VolumeMissing(u16),

    /// A payload or file did not have the promised size
    #[error("Size mismatch on chunk {chunk}: expected {expected}, got {got}")]
    SizeMismatch {
        expected: u64,
        got: u64,
        chunk: u16,
    },

    /// The manifest document is not a valid pack input
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// The operation was cancelled through its token
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error from a port implementation
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn corrupt(kind: CorruptKind, offender: impl Into<u32>) -> Self {
        Self::CorruptIndex {
            kind,
            offender: offender.into(),
        }
    }
}
