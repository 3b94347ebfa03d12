//! DZ metadata serialization
//!
//! The builder is the write-side mirror of [`crate::parser`]: it emits
//! the metadata block byte-for-byte in table order. It serializes
//! whatever it is given — semantic validation (index bounds, flag
//! well-formedness) is the caller's business — so corrupt fixtures for
//! parser tests can be produced with it too.

use std::io::Write;

use crate::{
    ArchiveMetadata, ArchiveSettings, ChunkFlags, ChunkSettings, RangeSettings, Result, mapping,
};

fn write_cstring<W: Write>(w: &mut W, s: &str) -> Result<()> {
    w.write_all(s.as_bytes())?;
    w.write_all(&[0])?;
    Ok(())
}

/// Serialized size of the metadata block, in bytes
///
/// The pack pipeline reserves exactly this much at the head of the main
/// volume before any payload is placed, then rewinds and fills it in.
pub fn metadata_size(meta: &ArchiveMetadata) -> u64 {
    let strings: u64 = meta
        .user_files
        .iter()
        .chain(meta.directories.iter())
        .chain(meta.volume_names.iter())
        .map(|s| s.len() as u64 + 1)
        .sum();

    let decoder_blocks: u64 = meta
        .codec_occurrence_order()
        .iter()
        .map(|&bit| {
            if bit == ChunkFlags::DZ {
                RangeSettings::SIZE
            } else {
                0
            }
        })
        .sum();

    ArchiveSettings::SIZE
        + strings
        + mapping::stream_len(&meta.map)
        + ChunkSettings::SIZE
        + meta.chunks.len() as u64 * crate::ChunkEntry::SIZE
        + decoder_blocks
}

/// Write the complete metadata block; returns the bytes written
pub fn write_metadata<W: Write>(w: &mut W, meta: &ArchiveMetadata) -> Result<u64> {
    let settings = ArchiveSettings {
        num_user_files: meta.user_files.len() as u16,
        num_directories: meta.directories.len() as u16,
        version: meta.version,
    };
    settings.write(w)?;

    for name in &meta.user_files {
        write_cstring(w, name)?;
    }
    for name in &meta.directories {
        write_cstring(w, name)?;
    }

    for entry in &meta.map {
        entry.write(w)?;
    }

    let chunk_settings = ChunkSettings {
        num_archive_files: meta.num_archive_files(),
        num_chunks: meta.chunks.len() as u16,
    };
    chunk_settings.write(w)?;

    for chunk in &meta.chunks {
        chunk.write(w)?;
    }

    for name in &meta.volume_names {
        write_cstring(w, name)?;
    }

    for bit in meta.codec_occurrence_order() {
        if bit == ChunkFlags::DZ {
            // An absent block for a DZ-flagged archive still has to
            // occupy its ten bytes, matching the original tooling.
            let block = meta.range_settings.unwrap_or(RangeSettings([0u8; 10]));
            block.write(w)?;
        }
    }

    Ok(metadata_size(meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChunkEntry, FileMapEntry};

    #[test]
    fn test_metadata_size_matches_output() {
        let meta = ArchiveMetadata {
            version: 0,
            user_files: vec!["one".into(), "two".into(), "three".into()],
            directories: vec!["".into()],
            map: vec![
                FileMapEntry {
                    directory: 0,
                    chunks: vec![0],
                },
                FileMapEntry {
                    directory: 0,
                    chunks: vec![1],
                },
                FileMapEntry {
                    directory: 0,
                    chunks: vec![1, 2],
                },
            ],
            chunks: vec![
                ChunkEntry {
                    offset: 0,
                    compressed_length: 0,
                    decompressed_length: 16,
                    flags: ChunkFlags::new(ChunkFlags::ZERO),
                    archive_file: 0,
                },
                ChunkEntry {
                    offset: 0,
                    compressed_length: 8,
                    decompressed_length: 8,
                    flags: ChunkFlags::new(ChunkFlags::COPYCOMP),
                    archive_file: 0,
                },
                ChunkEntry {
                    offset: 8,
                    compressed_length: 4,
                    decompressed_length: 12,
                    flags: ChunkFlags::new(ChunkFlags::LZMA),
                    archive_file: 0,
                },
            ],
            volume_names: Vec::new(),
            range_settings: None,
        };

        let mut buf = Vec::new();
        let reported = write_metadata(&mut buf, &meta).unwrap();
        assert_eq!(buf.len() as u64, reported);
        assert_eq!(reported, metadata_size(&meta));
    }

    #[test]
    fn test_dz_archive_reserves_range_block() {
        let meta = ArchiveMetadata {
            version: 0,
            user_files: vec!["blob".into()],
            directories: vec!["".into()],
            map: vec![FileMapEntry {
                directory: 0,
                chunks: vec![0],
            }],
            chunks: vec![ChunkEntry {
                offset: 0,
                compressed_length: 64,
                decompressed_length: 256,
                flags: ChunkFlags::new(ChunkFlags::DZ),
                archive_file: 0,
            }],
            volume_names: Vec::new(),
            range_settings: None,
        };

        let mut buf = Vec::new();
        write_metadata(&mut buf, &meta).unwrap();
        // Trailing ten zero bytes stand in for the missing block.
        assert_eq!(&buf[buf.len() - 10..], &[0u8; 10]);
        assert_eq!(buf.len() as u64, metadata_size(&meta));
    }
}
