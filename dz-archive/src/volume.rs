//! Volume layout helpers
//!
//! The `compressed_length` field of legacy chunk tables is unreliable;
//! the true payload size of a chunk is the distance to the next chunk
//! in the same physical volume, or to end-of-volume for the last one.
//! The raw field is kept on the plan for diagnostics only.

use crate::error::{CorruptKind, Error, Result};
use crate::types::ChunkPlan;

/// Recompute every chunk's effective compressed length from offsets
///
/// `volume_lengths[i]` is the byte length of volume `i`. Fails with
/// `CorruptIndex(ChunkExtent)` when a chunk starts past the end of its
/// volume, and `VolumeMissing` when a chunk names a volume the source
/// does not have.
pub fn compute_effective_lengths(chunks: &mut [ChunkPlan], volume_lengths: &[u64]) -> Result<()> {
    let mut by_volume: Vec<Vec<usize>> = vec![Vec::new(); volume_lengths.len()];
    for (idx, chunk) in chunks.iter().enumerate() {
        let volume = chunk.volume as usize;
        if volume >= volume_lengths.len() {
            return Err(Error::VolumeMissing(chunk.volume));
        }
        by_volume[volume].push(idx);
    }

    for (volume, mut indices) in by_volume.into_iter().enumerate() {
        let volume_len = volume_lengths[volume];
        indices.sort_by_key(|&i| (chunks[i].offset, chunks[i].id));

        for pos in 0..indices.len() {
            let idx = indices[pos];
            let offset = chunks[idx].offset;
            if offset > volume_len {
                return Err(Error::corrupt(CorruptKind::ChunkExtent, chunks[idx].id));
            }
            let end = if pos + 1 < indices.len() {
                chunks[indices[pos + 1]].offset
            } else {
                volume_len
            };
            chunks[idx].effective_compressed_len = end - offset;
        }
    }

    Ok(())
}
