//! The user-file to chunk-and-directory mapping stream
//!
//! A flat u16 sequence consumed positionally: for each user file, the
//! directory index, then the chunk indices making up the file in order,
//! terminated by `0xFFFF`. Chunks spanning several files list their id
//! in each of the (adjacent) file records.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::{MAP_TERMINATOR, Result};

/// Mapping record for a single user file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapEntry {
    /// Index into the directory list
    pub directory: u16,
    /// Chunk indices in user-file order
    pub chunks: Vec<u16>,
}

impl FileMapEntry {
    /// Serialized size of this record in bytes
    pub fn encoded_len(&self) -> u64 {
        // directory + chunk ids + terminator, two bytes each
        2 * (self.chunks.len() as u64 + 2)
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u16::<LittleEndian>(self.directory)?;
        for &chunk in &self.chunks {
            w.write_u16::<LittleEndian>(chunk)?;
        }
        w.write_u16::<LittleEndian>(MAP_TERMINATOR)?;
        Ok(())
    }
}

/// Serialized size of a whole mapping stream
pub fn stream_len(entries: &[FileMapEntry]) -> u64 {
    entries.iter().map(FileMapEntry::encoded_len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_encoding() {
        let entry = FileMapEntry {
            directory: 2,
            chunks: vec![0, 1, 5],
        };

        let mut buf = Vec::new();
        entry.write(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, entry.encoded_len());
        assert_eq!(buf, vec![2, 0, 0, 0, 1, 0, 5, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_empty_chunk_list() {
        let entry = FileMapEntry {
            directory: 0,
            chunks: Vec::new(),
        };

        let mut buf = Vec::new();
        entry.write(&mut buf).unwrap();
        assert_eq!(buf, vec![0, 0, 0xFF, 0xFF]);
    }
}
