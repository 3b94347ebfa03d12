//! The manifest document
//!
//! Emitted by unpack and consumed by pack: a structural description of
//! the archive detailed enough to rebuild it. The encoding (the CLI
//! uses TOML) is the surrounding tool's concern; this module only
//! defines the serde shape and the conversion back into format tables.
//!
//! Per-chunk `size_compressed` carries the *recorded* on-disk value,
//! unreliable in legacy archives and kept for diagnostics — pack
//! recomputes real sizes as it writes. Per-file `size` carries the
//! decompressed length, which the DZ tables themselves cannot express
//! and which is required to split chunks spanning several files.

use serde::{Deserialize, Serialize};

use dz_format::{ArchiveMetadata, ChunkEntry, ChunkFlags, FileMapEntry, RangeSettings};

use crate::error::{Error, Result};

/// Top-level archive facts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub version: u8,
    pub num_files: u16,
    pub num_directories: u16,
    pub num_chunks: u16,
}

/// One user file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Sanitized logical path (`directory/name`)
    pub path: String,
    /// Directory string, normalized; empty for the root
    pub directory: String,
    /// File name as stored in the archive
    pub name: String,
    /// Decompressed length
    pub size: u64,
    /// Chunk ids in user-file order
    pub chunks: Vec<u16>,
}

/// One chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: u16,
    pub offset: u64,
    /// Recorded compressed length; diagnostic only
    pub size_compressed: u64,
    pub size_decompressed: u64,
    /// Flag names, e.g. `["COMBUF", "ZLIB"]`
    pub flags: Vec<String>,
    /// Physical volume index (0 = main)
    pub volume: u16,
}

/// The whole document
///
/// Plain-value fields come before the tables so the document always
/// serializes cleanly to TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Split-volume names beyond the main file
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Opaque range-coder settings block, when the archive carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_settings: Option<[u8; 10]>,
    pub archive: ArchiveInfo,
    pub files: Vec<FileRecord>,
    pub chunks: Vec<ChunkRecord>,
}

impl Manifest {
    /// Expected decompressed length per file, in file order
    pub fn file_lengths(&self) -> Vec<u64> {
        self.files.iter().map(|f| f.size).collect()
    }

    /// Rebuild format tables from the manifest
    ///
    /// Directory indices are reassigned from the per-file directory
    /// strings (root first); chunk offsets and compressed lengths come
    /// through as declared and are overwritten by the pack writer.
    pub fn to_metadata(&self) -> Result<ArchiveMetadata> {
        if self.files.is_empty() {
            return Err(Error::Manifest("manifest lists no files".into()));
        }
        if self.chunks.len() != self.archive.num_chunks as usize {
            return Err(Error::Manifest(format!(
                "chunk count {} disagrees with archive.num_chunks {}",
                self.chunks.len(),
                self.archive.num_chunks
            )));
        }
        for (pos, chunk) in self.chunks.iter().enumerate() {
            if chunk.id as usize != pos {
                return Err(Error::Manifest(format!(
                    "chunk records must be dense and sorted; found id {} at position {pos}",
                    chunk.id
                )));
            }
        }

        // Directory table: root first, then first-use order.
        let mut directories: Vec<String> = vec![String::new()];
        let mut map = Vec::with_capacity(self.files.len());
        let mut user_files = Vec::with_capacity(self.files.len());

        for file in &self.files {
            let dir = crate::paths::normalize(&file.directory);
            let directory = if dir.is_empty() {
                0u16
            } else {
                match directories.iter().position(|d| *d == dir) {
                    Some(i) => i as u16,
                    None => {
                        directories.push(dir);
                        directories.len() as u16 - 1
                    }
                }
            };
            user_files.push(file.name.clone());
            map.push(FileMapEntry {
                directory,
                chunks: file.chunks.clone(),
            });
        }

        let mut chunks = Vec::with_capacity(self.chunks.len());
        for record in &self.chunks {
            let flags = ChunkFlags::from_names(&record.flags).ok_or_else(|| {
                Error::Manifest(format!(
                    "chunk {} has unknown flag in {:?}",
                    record.id, record.flags
                ))
            })?;
            chunks.push(ChunkEntry {
                offset: record.offset as u32,
                compressed_length: record.size_compressed as u32,
                decompressed_length: record.size_decompressed as u32,
                flags,
                archive_file: record.volume,
            });
        }

        Ok(ArchiveMetadata {
            version: self.archive.version,
            user_files,
            directories,
            map,
            chunks,
            volume_names: self.volumes.clone(),
            range_settings: self.range_settings.map(RangeSettings),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest {
            archive: ArchiveInfo {
                version: 0,
                num_files: 2,
                num_directories: 2,
                num_chunks: 2,
            },
            volumes: vec![],
            range_settings: None,
            files: vec![
                FileRecord {
                    path: "a.bin".into(),
                    directory: String::new(),
                    name: "a.bin".into(),
                    size: 16,
                    chunks: vec![0],
                },
                FileRecord {
                    path: "maps/b.bin".into(),
                    directory: "maps".into(),
                    name: "b.bin".into(),
                    size: 8,
                    chunks: vec![1],
                },
            ],
            chunks: vec![
                ChunkRecord {
                    id: 0,
                    offset: 0,
                    size_compressed: 16,
                    size_decompressed: 16,
                    flags: vec!["COPYCOMP".into()],
                    volume: 0,
                },
                ChunkRecord {
                    id: 1,
                    offset: 16,
                    size_compressed: 8,
                    size_decompressed: 8,
                    flags: vec!["ZLIB".into()],
                    volume: 0,
                },
            ],
        }
    }

    #[test]
    fn test_to_metadata_reassigns_directories() {
        let metadata = sample().to_metadata().unwrap();
        assert_eq!(metadata.directories, vec!["".to_string(), "maps".into()]);
        assert_eq!(metadata.map[0].directory, 0);
        assert_eq!(metadata.map[1].directory, 1);
        assert_eq!(metadata.user_files, vec!["a.bin", "b.bin"]);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let mut manifest = sample();
        manifest.chunks[0].flags = vec!["ZSTD".into()];
        assert!(matches!(
            manifest.to_metadata(),
            Err(Error::Manifest(msg)) if msg.contains("unknown flag")
        ));
    }

    #[test]
    fn test_sparse_chunk_ids_rejected() {
        let mut manifest = sample();
        manifest.chunks[1].id = 4;
        assert!(manifest.to_metadata().is_err());
    }
}
