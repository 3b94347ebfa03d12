//! Resolved archive model types

use dz_format::ChunkFlags;

/// One consumer of a chunk's decompressed bytes
///
/// The next `len` bytes of the chunk (starting at `chunk_offset` in its
/// decompressed byte space) belong to `file` at `file_offset`. Solo
/// chunks have a single consumer covering them entirely; chunks spanning
/// several user files have one consumer per file, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConsumer {
    /// Index into the resolved file list
    pub file: u16,
    /// Start of the consumed range within the chunk
    pub chunk_offset: u64,
    /// Where the range lands within the user file
    pub file_offset: u64,
    /// Length of the consumed range
    pub len: u64,
}

/// Everything the pipelines need to know about one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Chunk id (position in the chunk table)
    pub id: u16,
    /// Physical volume holding the payload (0 = main)
    pub volume: u16,
    /// Payload offset within the volume
    pub offset: u64,
    /// The `compressed_length` field as recorded on disk; unreliable
    pub raw_compressed_len: u32,
    /// True payload size, recomputed from neighboring offsets
    pub effective_compressed_len: u64,
    /// Decompressed length
    pub decompressed_len: u64,
    /// Chunk flags
    pub flags: ChunkFlags,
    /// Byte attribution to user files, in file order
    pub consumers: Vec<ChunkConsumer>,
}

/// A user file with its chunk references resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// File name as stored in the archive
    pub name: String,
    /// Directory string after fixup, normalized
    pub directory: String,
    /// Sanitized forward-slash path handed to sinks
    pub logical_path: String,
    /// Index into the directory list
    pub directory_index: u16,
    /// Chunk ids in user-file order
    pub chunk_refs: Vec<u16>,
    /// Total decompressed length of the file
    pub expected_length: u64,
}
