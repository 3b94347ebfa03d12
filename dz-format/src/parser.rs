//! DZ metadata parsing
//!
//! Reads the complete metadata block from the start of the main volume:
//! archive settings, string tables, mapping stream, chunk settings,
//! chunk table, split-volume names and decoder settings blocks. Every
//! table is checked against the volume length before it is read, so a
//! table running past end-of-file surfaces as [`Error::Truncated`]
//! rather than a bare IO error.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;
use tracing::{debug, trace};

use crate::{
    ArchiveMetadata, ArchiveSettings, ChunkEntry, ChunkFlags, ChunkSettings, Error, FileMapEntry,
    MAP_TERMINATOR, RangeSettings, Result,
};

/// Position-tracking reader that refuses to run past the volume end
struct MetadataReader<R> {
    inner: R,
    pos: u64,
    len: u64,
}

impl<R: Read> MetadataReader<R> {
    fn new(inner: R, len: u64) -> Self {
        Self { inner, pos: 0, len }
    }

    /// Fail with `Truncated` if `bytes` more would run past the volume
    fn ensure(&self, bytes: u64) -> Result<()> {
        let expected = self.pos + bytes;
        if expected > self.len {
            return Err(Error::Truncated {
                expected,
                actual: self.len,
            });
        }
        Ok(())
    }

    fn read_u16_checked(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.read_u16::<LittleEndian>()?)
    }

    /// Read a null-terminated string, rejecting non-UTF-8 entries
    fn read_cstring(&mut self) -> Result<String> {
        let start = self.pos;
        let mut bytes = Vec::new();
        loop {
            self.ensure(1)?;
            let mut byte = [0u8; 1];
            self.inner.read_exact(&mut byte)?;
            self.pos += 1;
            if byte[0] == 0 {
                break;
            }
            bytes.push(byte[0]);
        }
        String::from_utf8(bytes).map_err(|_| Error::InvalidString { offset: start })
    }
}

impl<R: Read> Read for MetadataReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

/// Parse the complete metadata block of a DZ archive
///
/// `main_len` is the byte length of the main volume, used to detect
/// tables extending past end-of-file. Chunk flags are validated here;
/// a chunk naming zero or several compression algorithms fails with
/// [`Error::BadChunkFlags`]. An archive recording zero directories is
/// accepted — the legacy fixup for it belongs to the archive model,
/// not the codec.
pub fn parse_metadata<R: Read>(reader: R, main_len: u64) -> Result<ArchiveMetadata> {
    let mut r = MetadataReader::new(reader, main_len);

    r.ensure(ArchiveSettings::SIZE)?;
    let settings = ArchiveSettings::read(&mut r)?;
    debug!(
        "DZ v{}: {} user files, {} directories",
        settings.version, settings.num_user_files, settings.num_directories
    );

    let mut user_files = Vec::with_capacity(settings.num_user_files as usize);
    for _ in 0..settings.num_user_files {
        user_files.push(r.read_cstring()?);
    }

    let mut directories = Vec::with_capacity(settings.num_directories as usize);
    for _ in 0..settings.num_directories {
        directories.push(r.read_cstring()?);
    }

    let mut map = Vec::with_capacity(settings.num_user_files as usize);
    for _ in 0..settings.num_user_files {
        let directory = r.read_u16_checked()?;
        let mut chunks = Vec::new();
        loop {
            let value = r.read_u16_checked()?;
            if value == MAP_TERMINATOR {
                break;
            }
            chunks.push(value);
        }
        map.push(FileMapEntry { directory, chunks });
    }

    r.ensure(ChunkSettings::SIZE)?;
    let chunk_settings = ChunkSettings::read(&mut r)?;
    debug!(
        "{} chunks across {} archive files",
        chunk_settings.num_chunks, chunk_settings.num_archive_files
    );

    r.ensure(u64::from(chunk_settings.num_chunks) * ChunkEntry::SIZE)?;
    let mut chunks = Vec::with_capacity(chunk_settings.num_chunks as usize);
    for id in 0..chunk_settings.num_chunks {
        let entry = ChunkEntry::read(&mut r)?;
        entry.flags.compression_bit(id)?;
        trace!(
            "chunk {id}: volume {} offset {} flags {}",
            entry.archive_file, entry.offset, entry.flags
        );
        chunks.push(entry);
    }

    let extra_volumes = chunk_settings.num_archive_files.saturating_sub(1);
    let mut volume_names = Vec::with_capacity(extra_volumes as usize);
    for _ in 0..extra_volumes {
        volume_names.push(r.read_cstring()?);
    }

    let mut metadata = ArchiveMetadata {
        version: settings.version,
        user_files,
        directories,
        map,
        chunks,
        volume_names,
        range_settings: None,
    };

    // Decoder settings blocks follow in first-occurrence order of the
    // codec flags; the range coder's is the only one with a layout.
    for bit in metadata.codec_occurrence_order() {
        if bit == ChunkFlags::DZ {
            r.ensure(RangeSettings::SIZE)?;
            metadata.range_settings = Some(RangeSettings::read(&mut r)?);
        }
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::write_metadata;
    use std::io::Cursor;

    fn sample_metadata() -> ArchiveMetadata {
        ArchiveMetadata {
            version: 0,
            user_files: vec!["a.bin".into(), "b.txt".into()],
            directories: vec!["".into(), "data".into()],
            map: vec![
                FileMapEntry {
                    directory: 0,
                    chunks: vec![0],
                },
                FileMapEntry {
                    directory: 1,
                    chunks: vec![1, 2],
                },
            ],
            chunks: vec![
                ChunkEntry {
                    offset: 100,
                    compressed_length: 10,
                    decompressed_length: 20,
                    flags: ChunkFlags::new(ChunkFlags::ZLIB),
                    archive_file: 0,
                },
                ChunkEntry {
                    offset: 110,
                    compressed_length: 30,
                    decompressed_length: 30,
                    flags: ChunkFlags::new(ChunkFlags::COPYCOMP),
                    archive_file: 0,
                },
                ChunkEntry {
                    offset: 0,
                    compressed_length: 5,
                    decompressed_length: 40,
                    flags: ChunkFlags::new(ChunkFlags::BZIP),
                    archive_file: 1,
                },
            ],
            volume_names: vec!["sample.d01".into()],
            range_settings: None,
        }
    }

    #[test]
    fn test_metadata_round_trip() {
        let metadata = sample_metadata();
        let mut buf = Vec::new();
        write_metadata(&mut buf, &metadata).unwrap();

        let parsed = parse_metadata(Cursor::new(&buf), buf.len() as u64).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_range_settings_round_trip() {
        let mut metadata = sample_metadata();
        metadata.chunks[1].flags = ChunkFlags::new(ChunkFlags::DZ);
        metadata.range_settings = Some(RangeSettings([30, 1, 12, 4, 8, 10, 2, 14, 3, 4]));

        let mut buf = Vec::new();
        write_metadata(&mut buf, &metadata).unwrap();

        let parsed = parse_metadata(Cursor::new(&buf), buf.len() as u64).unwrap();
        assert_eq!(parsed.range_settings, metadata.range_settings);
    }

    #[test]
    fn test_truncated_chunk_table() {
        let metadata = sample_metadata();
        let mut buf = Vec::new();
        write_metadata(&mut buf, &metadata).unwrap();

        // Claim a volume shorter than the serialized tables.
        let err = parse_metadata(Cursor::new(&buf), buf.len() as u64 - 20).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }

    #[test]
    fn test_bad_chunk_flags_rejected() {
        let mut metadata = sample_metadata();
        metadata.chunks[0].flags = ChunkFlags::new(ChunkFlags::ZLIB | ChunkFlags::LZMA);

        let mut buf = Vec::new();
        write_metadata(&mut buf, &metadata).unwrap();

        let err = parse_metadata(Cursor::new(&buf), buf.len() as u64).unwrap_err();
        assert!(matches!(err, Error::BadChunkFlags(0)));
    }

    #[test]
    fn test_zero_directories_accepted() {
        let mut metadata = sample_metadata();
        metadata.directories.clear();
        for entry in &mut metadata.map {
            entry.directory = 0;
        }

        let mut buf = Vec::new();
        write_metadata(&mut buf, &metadata).unwrap();

        let parsed = parse_metadata(Cursor::new(&buf), buf.len() as u64).unwrap();
        assert!(parsed.directories.is_empty());
        assert_eq!(parsed.user_files.len(), 2);
    }
}
