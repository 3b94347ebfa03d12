//! The unpack pipeline
//!
//! Parse → resolve → recompute payload extents → decompress every
//! chunk on the worker pool → assemble and write user files → emit the
//! manifest. Chunk decompression order is unconstrained; file contents
//! are assembled from per-chunk consumer ranges, which also covers
//! COMBUF stream slicing. The sink's `finalize` runs exactly once,
//! committed or not.

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, BufReader, Read};
use tracing::{debug, warn};

use dz_format::{ArchiveMetadata, ChunkFlags, codec, parser};

use crate::manifest::{ArchiveInfo, ChunkRecord, FileRecord, Manifest};
use crate::model::ArchiveModel;
use crate::ports::{UnpackOptions, UnpackSink, UnpackSource};
use crate::progress::Progress;
use crate::types::ChunkPlan;
use crate::volume;
use crate::{Error, Result};

/// Presents one volume of an [`UnpackSource`] as a sequential reader
struct VolumeReader<'a> {
    source: &'a dyn UnpackSource,
    volume: u16,
    pos: u64,
    len: u64,
}

impl Read for VolumeReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(remaining as usize);
        let bytes = self
            .source
            .read_at(self.volume, self.pos, want)
            .map_err(io::Error::other)?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        self.pos += bytes.len() as u64;
        Ok(bytes.len())
    }
}

enum ChunkPayload {
    /// Decompressed bytes ready for consumer slicing
    Decoded(Vec<u8>),
    /// Undecodable payload kept verbatim under `keep_raw`
    Raw(Vec<u8>),
    /// Chunk has no consumers; nothing was read
    Skipped,
}

/// Unpack an archive from `source` into `sink`
///
/// Returns the manifest describing what was parsed. The sink's
/// `finalize` is invoked on every exit path, with `committed = false`
/// on error or cancellation so partial output can be discarded.
pub fn unpack(
    source: &dyn UnpackSource,
    sink: &dyn UnpackSink,
    progress: &dyn Progress,
    options: &UnpackOptions,
) -> Result<Manifest> {
    let result = run(source, sink, progress, options);
    let committed = result.is_ok();
    let finalized = sink.finalize(committed);
    let manifest = result?;
    finalized?;
    progress.finish("unpack complete");
    Ok(manifest)
}

fn run(
    source: &dyn UnpackSource,
    sink: &dyn UnpackSink,
    progress: &dyn Progress,
    options: &UnpackOptions,
) -> Result<Manifest> {
    options.cancel.check()?;

    let main_len = source.volume_length(0)?;
    let reader = BufReader::with_capacity(
        64 * 1024,
        VolumeReader {
            source,
            volume: 0,
            pos: 0,
            len: main_len,
        },
    );
    let metadata = parser::parse_metadata(reader, main_len)?;

    let needed = metadata.num_archive_files();
    if source.volume_count() < needed {
        return Err(Error::VolumeMissing(source.volume_count()));
    }

    let mut model = ArchiveModel::resolve(&metadata, options.file_lengths.as_deref())?;
    if model.synthesized_root {
        progress.warn("archive stores zero directories; synthesized an empty root");
    }

    let volume_lengths: Vec<u64> = (0..needed)
        .map(|i| source.volume_length(i))
        .collect::<Result<_>>()?;
    volume::compute_effective_lengths(&mut model.chunks, &volume_lengths)?;

    debug!(
        "unpacking {} files from {} chunks across {} volumes",
        model.files.len(),
        model.chunks.len(),
        needed
    );
    progress.start(model.files.len() as u64);

    let dirs: BTreeSet<&str> = model
        .files
        .iter()
        .map(|f| f.directory.as_str())
        .filter(|d| !d.is_empty())
        .collect();
    for dir in dirs {
        sink.create_dir(dir)?;
    }

    // Parallel phase: every referenced chunk is read from its volume
    // and decompressed; order is unconstrained.
    progress.info("decompressing chunks");
    let payloads: Vec<ChunkPayload> = model
        .chunks
        .par_iter()
        .map(|chunk| {
            options.cancel.check()?;
            if chunk.consumers.is_empty() {
                return Ok(ChunkPayload::Skipped);
            }
            decode_chunk(source, chunk, options.keep_raw, progress)
        })
        .collect::<Result<Vec<_>>>()?;

    // Assembly: scatter consumer ranges into per-file buffers. Raw
    // payloads go to a `.raw` sidecar beside their first consumer.
    let mut buffers: Vec<Vec<u8>> = model
        .files
        .iter()
        .map(|f| vec![0u8; f.expected_length as usize])
        .collect();
    let mut sidecars: BTreeMap<u16, Vec<u8>> = BTreeMap::new();

    for (chunk, payload) in model.chunks.iter().zip(&payloads) {
        match payload {
            ChunkPayload::Decoded(bytes) => {
                for consumer in &chunk.consumers {
                    let src = consumer.chunk_offset as usize..(consumer.chunk_offset + consumer.len) as usize;
                    let dst = consumer.file_offset as usize..(consumer.file_offset + consumer.len) as usize;
                    buffers[consumer.file as usize][dst].copy_from_slice(&bytes[src]);
                }
            }
            ChunkPayload::Raw(bytes) => {
                if let Some(consumer) = chunk.consumers.first() {
                    sidecars
                        .entry(consumer.file)
                        .or_default()
                        .extend_from_slice(bytes);
                }
            }
            ChunkPayload::Skipped => {}
        }
    }

    progress.info("writing files");
    for (fi, file) in model.files.iter().enumerate() {
        options.cancel.check()?;
        sink.write_file(&file.logical_path, &buffers[fi])?;
        progress.inc(1);
    }
    for (fi, raw) in &sidecars {
        let path = format!("{}.raw", model.files[*fi as usize].logical_path);
        sink.write_file(&path, raw)?;
    }

    Ok(build_manifest(&metadata, &model))
}

fn decode_chunk(
    source: &dyn UnpackSource,
    chunk: &ChunkPlan,
    keep_raw: bool,
    progress: &dyn Progress,
) -> Result<ChunkPayload> {
    // ZERO chunks have no payload at all.
    if chunk.flags.has(ChunkFlags::ZERO) {
        return Ok(ChunkPayload::Decoded(vec![
            0u8;
            chunk.decompressed_len as usize
        ]));
    }

    let payload = source.read_at(
        chunk.volume,
        chunk.offset,
        chunk.effective_compressed_len as usize,
    )?;

    match codec::decompress(chunk.id, chunk.flags, &payload, chunk.decompressed_len) {
        Ok(bytes) => Ok(ChunkPayload::Decoded(bytes)),
        Err(
            e @ (dz_format::Error::UnsupportedCodec { .. } | dz_format::Error::CodecFailure { .. }),
        ) if keep_raw => {
            warn!("chunk {} kept raw: {e}", chunk.id);
            progress.warn(&format!("chunk {} not decoded ({e}); raw payload kept", chunk.id));
            Ok(ChunkPayload::Raw(payload))
        }
        Err(e) => Err(e.into()),
    }
}

fn build_manifest(metadata: &ArchiveMetadata, model: &ArchiveModel) -> Manifest {
    Manifest {
        archive: ArchiveInfo {
            version: metadata.version,
            num_files: model.files.len() as u16,
            num_directories: model.directories.len() as u16,
            num_chunks: model.chunks.len() as u16,
        },
        volumes: model.volume_names.clone(),
        range_settings: metadata.range_settings.map(|r| r.0),
        files: model
            .files
            .iter()
            .map(|f| FileRecord {
                path: f.logical_path.clone(),
                directory: f.directory.clone(),
                name: f.name.clone(),
                size: f.expected_length,
                chunks: f.chunk_refs.clone(),
            })
            .collect(),
        chunks: model
            .chunks
            .iter()
            .map(|c| ChunkRecord {
                id: c.id,
                offset: c.offset,
                size_compressed: u64::from(c.raw_compressed_len),
                size_decompressed: c.decompressed_len,
                flags: c.flags.names().into_iter().map(String::from).collect(),
                volume: c.volume,
            })
            .collect(),
    }
}
