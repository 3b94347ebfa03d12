//! The pack pipeline
//!
//! Producer/writer model: worker threads claim chunk jobs in ascending
//! id order from a shared counter, gather and compress their payloads,
//! and hand `(chunk_id, payload)` to a dedicated writer over a bounded
//! channel; the writer appends payloads to the volumes in strictly
//! ascending chunk-id order, holding early arrivals in a reorder
//! buffer. A worker can only claim its next job after handing off the
//! previous payload, so at most `workers + channel capacity` payloads
//! are ever in flight — memory stays bounded even on highly
//! compressible input.
//!
//! The metadata block is reserved at the head of the main volume before
//! any payload is placed, then rewritten with the final offsets, sizes
//! and volume assignments once the last chunk has landed.

use crossbeam_channel::bounded;
use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

use dz_format::{ChunkFlags, builder, codec};

use crate::manifest::Manifest;
use crate::model::ArchiveModel;
use crate::ports::{PackOptions, PackSink, PackSource};
use crate::progress::Progress;
use crate::{Error, Result};

/// Everything a worker needs to produce one chunk payload
struct ChunkJob {
    id: u16,
    flags: ChunkFlags,
    decompressed_len: u64,
    /// `(logical_path, offset, len)` source ranges, in chunk order
    gathers: Vec<(String, u64, usize)>,
    declared_volume: u16,
}

/// Where one chunk payload ended up
#[derive(Clone, Copy)]
struct Placement {
    volume: u16,
    offset: u64,
    len: u64,
}

/// Pack a manifest's file tree into an archive
///
/// Validates the manifest against the source, compresses every chunk in
/// parallel and writes the volumes through `sink`. Returns the
/// finalized manifest (real offsets and compressed sizes). The sink's
/// `finalize` is invoked on every exit path; on error or cancellation
/// it receives `committed = false` and no manifest, so no partial
/// volume is committed.
pub fn pack(
    manifest: &Manifest,
    source: &dyn PackSource,
    sink: &mut dyn PackSink,
    progress: &dyn Progress,
    options: &PackOptions,
) -> Result<Manifest> {
    match run(manifest, source, sink, progress, options) {
        Ok(finalized) => {
            sink.finalize(Some(&finalized), true)?;
            progress.finish("pack complete");
            Ok(finalized)
        }
        Err(e) => {
            let _ = sink.finalize(None, false);
            Err(e)
        }
    }
}

fn run(
    manifest: &Manifest,
    source: &dyn PackSource,
    sink: &mut dyn PackSink,
    progress: &dyn Progress,
    options: &PackOptions,
) -> Result<Manifest> {
    options.cancel.check()?;

    let mut metadata = manifest.to_metadata()?;

    // The source decides the true file lengths; the manifest has to
    // agree with it before any chunk boundary math happens.
    let mut lengths = Vec::with_capacity(manifest.files.len());
    for file in &manifest.files {
        let logical = crate::paths::sanitize(&file.path)?;
        let actual = source.file_length(&logical)?;
        if actual != file.size {
            return Err(Error::Manifest(format!(
                "source file {logical:?} has {actual} bytes, manifest declares {}",
                file.size
            )));
        }
        lengths.push(actual);
    }

    let model = ArchiveModel::resolve(&metadata, Some(&lengths))?;
    for (resolved, record) in model.files.iter().zip(&manifest.files) {
        let declared = crate::paths::sanitize(&record.path)?;
        if resolved.logical_path != declared {
            return Err(Error::Manifest(format!(
                "file path {declared:?} disagrees with its directory/name ({:?})",
                resolved.logical_path
            )));
        }
    }

    let num_volumes = metadata.num_archive_files();
    let header_size = builder::metadata_size(&metadata);

    // Reserve the metadata region with a placeholder copy; its size is
    // fixed by names and counts, which do not change past this point.
    sink.open_volume(0)?;
    let mut header = Vec::with_capacity(header_size as usize);
    builder::write_metadata(&mut header, &metadata)?;
    let at = sink.write(0, &header)?;
    debug_assert_eq!(at, 0);

    let jobs: Vec<ChunkJob> = model
        .chunks
        .iter()
        .map(|chunk| ChunkJob {
            id: chunk.id,
            flags: chunk.flags,
            decompressed_len: chunk.decompressed_len,
            gathers: chunk
                .consumers
                .iter()
                .map(|c| {
                    (
                        model.files[c.file as usize].logical_path.clone(),
                        c.file_offset,
                        c.len as usize,
                    )
                })
                .collect(),
            declared_volume: chunk.volume,
        })
        .collect();

    debug!(
        "packing {} chunks into {} volume(s), header {} bytes",
        jobs.len(),
        num_volumes,
        header_size
    );
    progress.start(jobs.len() as u64);
    progress.info("compressing chunks");

    let workers = rayon::current_num_threads().max(1);
    let (tx, rx) = bounded::<(u16, Result<Vec<u8>>)>(workers * 2);
    let next_job = AtomicUsize::new(0);

    let placements = {
        let jobs = &jobs;
        let next_job = &next_job;
        let writer_sink: &mut dyn PackSink = &mut *sink;

        std::thread::scope(move |scope| {
            let writer = scope.spawn(move || {
                write_payloads(
                    writer_sink,
                    rx,
                    jobs,
                    num_volumes,
                    options.split_threshold,
                    progress,
                )
            });

            // Workers claim jobs in ascending order and block on the
            // bounded channel, which is the back-pressure bound.
            for _ in 0..workers {
                let tx = tx.clone();
                scope.spawn(move || {
                    loop {
                        let i = next_job.fetch_add(1, Ordering::Relaxed);
                        let Some(job) = jobs.get(i) else { break };
                        let payload = produce(job, source, options);
                        if tx.send((job.id, payload)).is_err() {
                            // Writer bailed out; its join result carries
                            // the error.
                            break;
                        }
                    }
                });
            }
            drop(tx);

            writer
                .join()
                .map_err(|_| Error::Io(io::Error::other("writer thread panicked")))?
        })?
    };

    // Patch the tables with what the writer actually did.
    for (chunk, placement) in metadata.chunks.iter_mut().zip(&placements) {
        if placement.offset > u64::from(u32::MAX) || placement.len > u64::from(u32::MAX) {
            return Err(Error::Manifest(format!(
                "chunk placement at offset {} exceeds the format's 32-bit range",
                placement.offset
            )));
        }
        chunk.offset = placement.offset as u32;
        chunk.compressed_length = placement.len as u32;
        chunk.archive_file = placement.volume;
    }

    let mut header = Vec::with_capacity(header_size as usize);
    builder::write_metadata(&mut header, &metadata)?;
    debug_assert_eq!(header.len() as u64, header_size);
    sink.write_at(0, 0, &header)?;

    let mut finalized = manifest.clone();
    for (record, placement) in finalized.chunks.iter_mut().zip(&placements) {
        record.offset = placement.offset;
        record.size_compressed = placement.len;
        record.volume = placement.volume;
    }
    Ok(finalized)
}

/// Gather and compress one chunk on a worker
fn produce(job: &ChunkJob, source: &dyn PackSource, options: &PackOptions) -> Result<Vec<u8>> {
    options.cancel.check()?;

    // ZERO chunks encode as an empty payload.
    if job.flags.has(ChunkFlags::ZERO) {
        return Ok(Vec::new());
    }

    let mut data = Vec::with_capacity(job.decompressed_len as usize);
    for (path, offset, len) in &job.gathers {
        data.extend_from_slice(&source.read_range(path, *offset, *len)?);
    }
    if data.len() as u64 != job.decompressed_len {
        return Err(Error::SizeMismatch {
            expected: job.decompressed_len,
            got: data.len() as u64,
            chunk: job.id,
        });
    }

    Ok(codec::compress(job.id, job.flags, &data)?)
}

/// The single writer role: strictly ascending chunk ids, bounded
/// reorder buffer, volume roll-over
fn write_payloads(
    sink: &mut dyn PackSink,
    rx: crossbeam_channel::Receiver<(u16, Result<Vec<u8>>)>,
    jobs: &[ChunkJob],
    num_volumes: u16,
    split_threshold: Option<u64>,
    progress: &dyn Progress,
) -> Result<Vec<Placement>> {
    let total = jobs.len();
    let mut placements = Vec::with_capacity(total);
    let mut pending: BTreeMap<u16, Vec<u8>> = BTreeMap::new();
    let mut opened = vec![false; num_volumes as usize];
    opened[0] = true;
    let mut active_volume: u16 = 0;
    let mut overflow_warned = false;

    let mut next = 0usize;
    while next < total {
        let payload = match pending.remove(&(next as u16)) {
            Some(payload) => payload,
            None => match rx.recv() {
                Ok((id, Ok(payload))) => {
                    if id as usize == next {
                        payload
                    } else {
                        pending.insert(id, payload);
                        continue;
                    }
                }
                Ok((_, Err(e))) => return Err(e),
                Err(_) => {
                    return Err(Error::Io(io::Error::other(
                        "compression workers disconnected before the last chunk",
                    )));
                }
            },
        };

        let volume = match split_threshold {
            Some(threshold) => {
                // Roll over when this payload would push the active
                // volume past the threshold and a declared volume is
                // still available.
                let mut volume = active_volume;
                if sink.volume_offset(volume) + payload.len() as u64 > threshold {
                    if volume + 1 < num_volumes {
                        volume += 1;
                        active_volume = volume;
                    } else if !overflow_warned {
                        warn!("last declared volume exceeds the split threshold");
                        progress.warn("last declared volume exceeds the split threshold");
                        overflow_warned = true;
                    }
                }
                volume
            }
            None => jobs[next].declared_volume,
        };

        if !opened[volume as usize] {
            sink.open_volume(volume)?;
            opened[volume as usize] = true;
        }

        let offset = sink.write(volume, &payload)?;
        placements.push(Placement {
            volume,
            offset,
            len: payload.len() as u64,
        });
        progress.inc(1);
        next += 1;
    }

    Ok(placements)
}
