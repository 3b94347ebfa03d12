//! Chunk table records

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::{ChunkFlags, Result};

/// One 16-byte record of the chunk table
///
/// `compressed_length` is known to be unreliable in archives produced by
/// the original tooling; readers recompute the effective payload size
/// from neighboring offsets and treat this field as diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkEntry {
    /// Location of the chunk within its physical file
    pub offset: u32,
    /// Recorded compressed length (unreliable, see above)
    pub compressed_length: u32,
    /// Length of the original data
    pub decompressed_length: u32,
    /// Chunk flags
    pub flags: ChunkFlags,
    /// Index of the physical file holding the payload (0 = main volume)
    pub archive_file: u16,
}

impl ChunkEntry {
    /// Serialized size in bytes
    pub const SIZE: u64 = 16;

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let offset = r.read_u32::<LittleEndian>()?;
        let compressed_length = r.read_u32::<LittleEndian>()?;
        let decompressed_length = r.read_u32::<LittleEndian>()?;
        let flags = ChunkFlags::new(r.read_u16::<LittleEndian>()?);
        let archive_file = r.read_u16::<LittleEndian>()?;

        Ok(Self {
            offset,
            compressed_length,
            decompressed_length,
            flags,
            archive_file,
        })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.offset)?;
        w.write_u32::<LittleEndian>(self.compressed_length)?;
        w.write_u32::<LittleEndian>(self.decompressed_length)?;
        w.write_u16::<LittleEndian>(self.flags.bits())?;
        w.write_u16::<LittleEndian>(self.archive_file)?;
        Ok(())
    }
}
