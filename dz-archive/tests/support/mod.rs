#![allow(dead_code)]

//! Shared fixtures for the pipeline tests: build archive volumes in
//! memory from metadata plus per-chunk payloads.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use dz_archive::{CancelToken, Progress};
use dz_format::{ArchiveMetadata, ChunkEntry, ChunkFlags, FileMapEntry, builder, codec};

/// Assemble volume byte vectors: metadata at the head of volume 0,
/// payloads appended in chunk-id order to their assigned volumes.
/// Chunk offsets are filled in; recorded compressed lengths are left
/// exactly as the caller set them (they are allowed to lie).
pub fn layout(meta: &mut ArchiveMetadata, payloads: &[Vec<u8>]) -> Vec<Vec<u8>> {
    assert_eq!(meta.chunks.len(), payloads.len());

    let header = builder::metadata_size(meta);
    let volumes = meta.num_archive_files() as usize;
    let mut cursors = vec![0u64; volumes];
    cursors[0] = header;

    for (i, chunk) in meta.chunks.iter_mut().enumerate() {
        chunk.offset = cursors[chunk.archive_file as usize] as u32;
        cursors[chunk.archive_file as usize] += payloads[i].len() as u64;
    }

    let mut out = vec![Vec::new(); volumes];
    builder::write_metadata(&mut out[0], meta).unwrap();
    for (i, chunk) in meta.chunks.iter().enumerate() {
        out[chunk.archive_file as usize].extend_from_slice(&payloads[i]);
    }
    out
}

pub fn chunk(d_len: u32, flags: u16, volume: u16) -> ChunkEntry {
    ChunkEntry {
        offset: 0,
        compressed_length: 0,
        decompressed_length: d_len,
        flags: ChunkFlags::new(flags),
        archive_file: volume,
    }
}

pub fn map_entry(directory: u16, chunks: Vec<u16>) -> FileMapEntry {
    FileMapEntry { directory, chunks }
}

pub fn metadata(
    files: &[&str],
    directories: &[&str],
    map: Vec<FileMapEntry>,
    chunks: Vec<ChunkEntry>,
    volume_names: &[&str],
) -> ArchiveMetadata {
    ArchiveMetadata {
        version: 0,
        user_files: files.iter().map(|s| s.to_string()).collect(),
        directories: directories.iter().map(|s| s.to_string()).collect(),
        map,
        chunks,
        volume_names: volume_names.iter().map(|s| s.to_string()).collect(),
        range_settings: None,
    }
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    codec::compress(0, ChunkFlags::new(ChunkFlags::ZLIB), data).unwrap()
}

pub fn bzip(data: &[u8]) -> Vec<u8> {
    codec::compress(0, ChunkFlags::new(ChunkFlags::BZIP), data).unwrap()
}

/// Progress observer collecting warnings and counting increments
#[derive(Default)]
pub struct RecordingProgress {
    pub warnings: Mutex<Vec<String>>,
    pub incs: AtomicU64,
}

impl Progress for RecordingProgress {
    fn inc(&self, n: u64) {
        self.incs.fetch_add(n, Ordering::Relaxed);
    }

    fn warn(&self, msg: &str) {
        self.warnings.lock().unwrap().push(msg.to_string());
    }
}

impl RecordingProgress {
    pub fn warning_count(&self) -> usize {
        self.warnings.lock().unwrap().len()
    }

    pub fn has_warning_containing(&self, needle: &str) -> bool {
        self.warnings
            .lock()
            .unwrap()
            .iter()
            .any(|w| w.contains(needle))
    }
}

/// Progress observer that fires a cancellation token after a number of
/// completed items
pub struct CancelAfter {
    pub token: CancelToken,
    pub after: u64,
    seen: AtomicU64,
}

impl CancelAfter {
    pub fn new(token: CancelToken, after: u64) -> Self {
        Self {
            token,
            after,
            seen: AtomicU64::new(0),
        }
    }
}

impl Progress for CancelAfter {
    fn inc(&self, n: u64) {
        let seen = self.seen.fetch_add(n, Ordering::Relaxed) + n;
        if seen >= self.after {
            self.token.cancel();
        }
    }
}
