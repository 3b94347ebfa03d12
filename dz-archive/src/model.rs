//! Archive model resolution
//!
//! Rebuilds the user-file ↔ chunk ↔ directory graph from the parsed
//! tables. The mapping stream is walked positionally: each record names
//! a directory and the chunks making up one user file; a chunk listed by
//! several (necessarily adjacent) files spans them, and its bytes are
//! attributed by a sequential consumption walk. COMBUF chunks are
//! projected through their concatenated logical stream, which collapses
//! the combined-buffer case into ordinary per-chunk consumers.
//!
//! The DZ tables store no per-file lengths, so the boundaries of a
//! shared chunk can only be derived when expected lengths are supplied
//! (pack always has them from the source, unpack optionally via
//! options). Archives whose chunks are all solo resolve without any.

use tracing::warn;

use dz_format::{ArchiveMetadata, ChunkFlags};

use crate::error::{CorruptKind, Error, Result};
use crate::paths;
use crate::types::{ChunkConsumer, ChunkPlan, ResolvedFile};

/// Fully resolved archive contents
#[derive(Debug, Clone)]
pub struct ArchiveModel {
    /// User files in archive order
    pub files: Vec<ResolvedFile>,
    /// Chunk plans in chunk-id order; `effective_compressed_len` is
    /// filled in by the pipelines once volume lengths are known
    pub chunks: Vec<ChunkPlan>,
    /// Directory list after the legacy fixup
    pub directories: Vec<String>,
    /// Split-volume names (index 1..)
    pub volume_names: Vec<String>,
    /// Ids of COMBUF chunks in stream order
    pub combuf_members: Vec<u16>,
    /// Whether the empty root directory was synthesized
    pub synthesized_root: bool,
}

impl ArchiveModel {
    /// Resolve the model from parsed metadata
    ///
    /// `file_lengths`, when given, must hold one expected decompressed
    /// length per user file and is required to split chunks shared
    /// between files.
    pub fn resolve(meta: &ArchiveMetadata, file_lengths: Option<&[u64]>) -> Result<Self> {
        if meta.user_files.is_empty() {
            return Err(Error::corrupt(CorruptKind::EmptyArchive, 0u32));
        }

        let mut synthesized_root = false;
        let directories = if meta.directories.is_empty() {
            warn!("archive stores zero directories; synthesizing empty root");
            synthesized_root = true;
            vec![String::new()]
        } else {
            meta.directories.clone()
        };

        let num_files = meta.user_files.len();
        let num_chunks = meta.chunks.len();

        if let Some(lengths) = file_lengths {
            if lengths.len() != num_files {
                return Err(Error::Manifest(format!(
                    "expected {num_files} file lengths, got {}",
                    lengths.len()
                )));
            }
        }

        let num_volumes = meta.num_archive_files();
        for chunk in &meta.chunks {
            if chunk.archive_file >= num_volumes {
                return Err(Error::VolumeMissing(chunk.archive_file));
            }
        }

        // First pass: which files reference each chunk, and is the
        // sharing shape representable at all.
        let mut ref_files: Vec<Vec<u16>> = vec![Vec::new(); num_chunks];
        for (fi, entry) in meta.map.iter().enumerate() {
            if (entry.directory as usize) >= directories.len() {
                return Err(Error::corrupt(CorruptKind::DirectoryIndex, entry.directory));
            }
            for &c in &entry.chunks {
                if (c as usize) >= num_chunks {
                    return Err(Error::corrupt(CorruptKind::ChunkIndex, c));
                }
                let refs = &mut ref_files[c as usize];
                if refs.last() == Some(&(fi as u16)) {
                    // Listed twice in the same file record.
                    return Err(Error::corrupt(CorruptKind::SharedChunkRange, c));
                }
                refs.push(fi as u16);
            }
        }
        for (cid, refs) in ref_files.iter().enumerate() {
            if refs.windows(2).any(|w| w[1] != w[0] + 1) {
                return Err(Error::corrupt(CorruptKind::SharedChunkRange, cid as u16));
            }
        }

        // COMBUF stream geometry: member chunks in chunk-index order.
        let combuf_members: Vec<u16> = meta
            .chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.flags.has(ChunkFlags::COMBUF))
            .map(|(id, _)| id as u16)
            .collect();
        let mut combuf_starts = vec![0u64; num_chunks];
        let mut combuf_total = 0u64;
        for &member in &combuf_members {
            combuf_starts[member as usize] = combuf_total;
            combuf_total += u64::from(meta.chunks[member as usize].decompressed_length);
        }
        let last_combuf_file: Option<u16> = combuf_members
            .iter()
            .filter_map(|&m| ref_files[m as usize].last().copied())
            .max();

        // Sequential consumption walk over files and their refs.
        let mut assigned = vec![0u64; num_files];
        let mut consumers: Vec<Vec<ChunkConsumer>> = vec![Vec::new(); num_chunks];
        let mut cursor = vec![0u64; num_chunks];
        let mut combuf_cursor = 0u64;

        for (fi, entry) in meta.map.iter().enumerate() {
            let file = fi as u16;
            let is_combuf_file = entry
                .chunks
                .iter()
                .any(|&c| meta.chunks[c as usize].flags.has(ChunkFlags::COMBUF));

            if is_combuf_file {
                // A file fed from the combined buffer slices the stream;
                // mixing in non-COMBUF refs has no defined byte order.
                if let Some(&c) = entry
                    .chunks
                    .iter()
                    .find(|&&c| !meta.chunks[c as usize].flags.has(ChunkFlags::COMBUF))
                {
                    return Err(Error::corrupt(CorruptKind::SharedChunkRange, c));
                }

                let take = if Some(file) == last_combuf_file {
                    combuf_total - combuf_cursor
                } else {
                    let lengths = file_lengths.ok_or_else(|| {
                        Error::corrupt(
                            CorruptKind::SharedChunkUnderdetermined,
                            entry.chunks.first().copied().unwrap_or_default(),
                        )
                    })?;
                    lengths[fi]
                };
                if combuf_cursor + take > combuf_total {
                    return Err(Error::corrupt(
                        CorruptKind::SharedChunkLength,
                        entry.chunks.first().copied().unwrap_or_default(),
                    ));
                }

                let slice_start = combuf_cursor;
                let slice_end = combuf_cursor + take;
                for &member in &combuf_members {
                    let chunk_start = combuf_starts[member as usize];
                    let chunk_end =
                        chunk_start + u64::from(meta.chunks[member as usize].decompressed_length);
                    let start = slice_start.max(chunk_start);
                    let end = slice_end.min(chunk_end);
                    if start < end {
                        consumers[member as usize].push(ChunkConsumer {
                            file,
                            chunk_offset: start - chunk_start,
                            file_offset: start - slice_start,
                            len: end - start,
                        });
                    }
                }

                // Every ref must actually intersect the slice it claims
                // to feed.
                if take > 0 {
                    for &c in &entry.chunks {
                        let chunk_start = combuf_starts[c as usize];
                        let chunk_end =
                            chunk_start + u64::from(meta.chunks[c as usize].decompressed_length);
                        if chunk_end <= slice_start || chunk_start >= slice_end {
                            return Err(Error::corrupt(CorruptKind::SharedChunkRange, c));
                        }
                    }
                }

                assigned[fi] = take;
                combuf_cursor = slice_end;
            } else {
                for (pos, &c) in entry.chunks.iter().enumerate() {
                    let cid = c as usize;
                    let refs = &ref_files[cid];
                    let shared = refs.len() > 1;
                    let d_len = u64::from(meta.chunks[cid].decompressed_length);

                    let take = if !shared {
                        d_len
                    } else if refs.last() == Some(&file) {
                        // The spanning chunk continues from the previous
                        // file, so it must open this one.
                        if pos != 0 {
                            return Err(Error::corrupt(CorruptKind::SharedChunkRange, c));
                        }
                        d_len - cursor[cid]
                    } else {
                        // Not the final consumer: the chunk runs on into
                        // the next file, so it must close this one, and
                        // this file's length decides the boundary.
                        if pos != entry.chunks.len() - 1 {
                            return Err(Error::corrupt(CorruptKind::SharedChunkRange, c));
                        }
                        let lengths = file_lengths.ok_or_else(|| {
                            Error::corrupt(CorruptKind::SharedChunkUnderdetermined, c)
                        })?;
                        lengths[fi].checked_sub(assigned[fi]).ok_or_else(|| {
                            Error::corrupt(CorruptKind::SharedChunkLength, c)
                        })?
                    };

                    if shared && cursor[cid] + take > d_len {
                        return Err(Error::corrupt(CorruptKind::SharedChunkLength, c));
                    }

                    consumers[cid].push(ChunkConsumer {
                        file,
                        chunk_offset: cursor[cid],
                        file_offset: assigned[fi],
                        len: take,
                    });
                    if shared {
                        cursor[cid] += take;
                    }
                    assigned[fi] += take;
                }
            }

            if let Some(lengths) = file_lengths {
                if lengths[fi] != assigned[fi] {
                    return Err(Error::corrupt(CorruptKind::FileLength, file));
                }
            }
        }

        // Shared chunks and the combined stream must be fully consumed.
        for (cid, refs) in ref_files.iter().enumerate() {
            if refs.len() > 1
                && !meta.chunks[cid].flags.has(ChunkFlags::COMBUF)
                && cursor[cid] != u64::from(meta.chunks[cid].decompressed_length)
            {
                return Err(Error::corrupt(CorruptKind::SharedChunkLength, cid as u16));
            }
        }
        if combuf_cursor != combuf_total && last_combuf_file.is_some() {
            return Err(Error::corrupt(
                CorruptKind::SharedChunkLength,
                combuf_members.first().copied().unwrap_or_default(),
            ));
        }

        // Assemble the resolved views; paths are sanitized here, before
        // anything crosses a port.
        let mut files = Vec::with_capacity(num_files);
        for (fi, entry) in meta.map.iter().enumerate() {
            let name = &meta.user_files[fi];
            let raw_dir = &directories[entry.directory as usize];
            let logical_path = paths::join_logical(raw_dir, name)?;
            files.push(ResolvedFile {
                name: name.clone(),
                directory: paths::normalize(raw_dir),
                logical_path,
                directory_index: entry.directory,
                chunk_refs: entry.chunks.clone(),
                expected_length: assigned[fi],
            });
        }

        let chunks = meta
            .chunks
            .iter()
            .enumerate()
            .map(|(id, entry)| ChunkPlan {
                id: id as u16,
                volume: entry.archive_file,
                offset: u64::from(entry.offset),
                raw_compressed_len: entry.compressed_length,
                effective_compressed_len: u64::from(entry.compressed_length),
                decompressed_len: u64::from(entry.decompressed_length),
                flags: entry.flags,
                consumers: std::mem::take(&mut consumers[id]),
            })
            .collect();

        Ok(Self {
            files,
            chunks,
            directories,
            volume_names: meta.volume_names.clone(),
            combuf_members,
            synthesized_root,
        })
    }
}
