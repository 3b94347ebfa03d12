//! Volume and file I/O ports
//!
//! The engine touches storage only through these traits. Sources serve
//! concurrent reads from the worker pool and must be `Sync`; sinks are
//! driven by a single writer at a time. Every logical path an
//! implementation receives has already been sanitized by the model
//! (forward slashes, no traversal); translating separators to the host
//! convention is the implementation's business.

use crate::Result;
use crate::manifest::Manifest;

/// Read side of an existing archive: a main file plus split volumes
///
/// Volume 0 is the main file. Implementations map indices to real
/// storage (for the CLI, the `.dz` / `.d01` / `.d02` suffix family).
pub trait UnpackSource: Send + Sync {
    /// Number of volumes available, the main file included
    fn volume_count(&self) -> u16;

    /// Byte length of a volume
    fn volume_length(&self, volume: u16) -> Result<u64>;

    /// Read `len` bytes at `offset` of `volume`
    fn read_at(&self, volume: u16, offset: u64, len: usize) -> Result<Vec<u8>>;
}

/// Write side of an extraction
pub trait UnpackSink: Send + Sync {
    /// Create a directory (idempotent, parents included)
    fn create_dir(&self, logical: &str) -> Result<()>;

    /// Write a complete extracted file
    fn write_file(&self, logical: &str, bytes: &[u8]) -> Result<()>;

    /// Called exactly once at the end of the operation, committed or
    /// not, so partial output can be kept or discarded
    fn finalize(&self, committed: bool) -> Result<()>;
}

/// Read side of a pack operation: the loose files being archived
pub trait PackSource: Send + Sync {
    /// Byte length of a source file
    fn file_length(&self, logical: &str) -> Result<u64>;

    /// Read `len` bytes at `offset` of a source file
    fn read_range(&self, logical: &str, offset: u64, len: usize) -> Result<Vec<u8>>;
}

/// Write side of a pack operation: the volumes being produced
///
/// Owned by the single writer role; implementations track one append
/// cursor per volume.
pub trait PackSink: Send {
    /// Make a volume available for writing; called before its first use
    fn open_volume(&mut self, volume: u16) -> Result<()>;

    /// Append bytes to a volume, returning the offset they landed at
    fn write(&mut self, volume: u16, bytes: &[u8]) -> Result<u64>;

    /// Overwrite bytes at a fixed offset (the header rewrite)
    fn write_at(&mut self, volume: u16, offset: u64, bytes: &[u8]) -> Result<()>;

    /// Current append cursor of a volume
    fn volume_offset(&self, volume: u16) -> u64;

    /// Called exactly once at the end with the finalized manifest;
    /// `committed` is false when the operation failed or was cancelled
    fn finalize(&mut self, manifest: Option<&Manifest>, committed: bool) -> Result<()>;
}

/// Options for [`unpack`](crate::unpack::unpack)
#[derive(Debug, Clone, Default)]
pub struct UnpackOptions {
    /// Route undecodable chunk payloads to `<path>.raw` sidecars and
    /// demote their errors to warnings
    pub keep_raw: bool,
    /// Expected decompressed length per user file, needed to split
    /// chunks shared between files (e.g. from an earlier manifest)
    pub file_lengths: Option<Vec<u64>>,
    /// Cancellation token observed at I/O boundaries
    pub cancel: crate::CancelToken,
}

/// Options for [`pack`](crate::pack::pack)
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    /// Roll over to the next declared volume when the active one would
    /// grow past this many bytes; `None` honors the manifest's per-chunk
    /// volume assignment
    pub split_threshold: Option<u64>,
    /// Cancellation token observed at I/O boundaries
    pub cancel: crate::CancelToken,
}
