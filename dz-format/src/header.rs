//! Fixed-layout DZ header structures
//!
//! Everything on disk is little-endian with no padding; fields are read
//! and written one at a time so host struct layout never leaks in.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::{DZ_MAGIC, DZ_VERSION, Error, Result};

/// Leading archive settings block: magic, table counts, version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSettings {
    /// Number of user files stored in the archive
    pub num_user_files: u16,
    /// Number of stored directories
    pub num_directories: u16,
    /// Settings structure version; only 0 exists
    pub version: u8,
}

impl ArchiveSettings {
    /// Serialized size in bytes
    pub const SIZE: u64 = 9;

    /// Read the settings block, validating magic and version
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != DZ_MAGIC {
            return Err(Error::BadMagic(magic));
        }

        let num_user_files = r.read_u16::<LittleEndian>()?;
        let num_directories = r.read_u16::<LittleEndian>()?;
        let version = r.read_u8()?;
        if version != DZ_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        Ok(Self {
            num_user_files,
            num_directories,
            version,
        })
    }

    /// Write the settings block
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&DZ_MAGIC)?;
        w.write_u16::<LittleEndian>(self.num_user_files)?;
        w.write_u16::<LittleEndian>(self.num_directories)?;
        w.write_u8(self.version)?;
        Ok(())
    }
}

/// Chunk settings block: volume count and chunk count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSettings {
    /// Number of physical files the archive is stored in
    pub num_archive_files: u16,
    /// Number of chunks they are divided into
    pub num_chunks: u16,
}

impl ChunkSettings {
    /// Serialized size in bytes
    pub const SIZE: u64 = 4;

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let num_archive_files = r.read_u16::<LittleEndian>()?;
        let num_chunks = r.read_u16::<LittleEndian>()?;
        Ok(Self {
            num_archive_files,
            num_chunks,
        })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u16::<LittleEndian>(self.num_archive_files)?;
        w.write_u16::<LittleEndian>(self.num_chunks)?;
        Ok(())
    }
}

/// Global range-coder decoder settings
///
/// The only per-decoder settings block with a defined layout. The range
/// coder itself is never decoded here, so the ten bytes are carried
/// opaquely and round-tripped as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSettings(pub [u8; 10]);

impl RangeSettings {
    /// Serialized size in bytes
    pub const SIZE: u64 = 10;

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let mut block = [0u8; 10];
        r.read_exact(&mut block)?;
        Ok(Self(block))
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_archive_settings_round_trip() {
        let settings = ArchiveSettings {
            num_user_files: 12,
            num_directories: 3,
            version: 0,
        };

        let mut buf = Vec::new();
        settings.write(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, ArchiveSettings::SIZE);
        assert_eq!(&buf[..4], b"DTRZ");

        let parsed = ArchiveSettings::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_bad_magic() {
        let data = b"ZIP!\x01\x00\x01\x00\x00";
        let err = ArchiveSettings::read(&mut Cursor::new(&data[..])).unwrap_err();
        assert!(matches!(err, Error::BadMagic(m) if &m == b"ZIP!"));
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = Vec::new();
        data.extend_from_slice(b"DTRZ");
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.push(9);

        let err = ArchiveSettings::read(&mut Cursor::new(&data)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(9)));
    }

    #[test]
    fn test_range_settings_opaque_round_trip() {
        let settings = RangeSettings([18, 0, 12, 4, 8, 10, 2, 14, 3, 4]);
        let mut buf = Vec::new();
        settings.write(&mut buf).unwrap();
        let parsed = RangeSettings::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(parsed, settings);
    }
}
