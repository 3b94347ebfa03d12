//! Chunk flag bitfield for the DZ chunk table

use crate::{Error, Result};
use std::fmt;

/// Chunk flags: one compression bit plus optional hints
///
/// Exactly one compression bit is expected per chunk; `COMBUF` and
/// `RANDOMACCESS` are hints that may accompany it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChunkFlags(pub u16);

impl ChunkFlags {
    /// Combined-buffer chunk; all such chunks form one logical stream (bit 0)
    pub const COMBUF: u16 = 0x001;

    /// Proprietary range-coder chunk, detected but never decoded (bit 2)
    pub const DZ: u16 = 0x004;

    /// Deflate (bit 3)
    pub const ZLIB: u16 = 0x008;

    /// bzip2 (bit 4)
    pub const BZIP: u16 = 0x010;

    /// Opaque MP3 passthrough (bit 5)
    pub const MP3: u16 = 0x020;

    /// Opaque JPEG passthrough (bit 6)
    pub const JPEG: u16 = 0x040;

    /// Synthesized zero bytes, no payload (bit 7)
    pub const ZERO: u16 = 0x080;

    /// Store, no compression (bit 8)
    pub const COPYCOMP: u16 = 0x100;

    /// Legacy LZMA with 13-byte header (bit 9)
    pub const LZMA: u16 = 0x200;

    /// Hint: decoder should buffer the whole chunk (bit 10)
    pub const RANDOMACCESS: u16 = 0x400;

    /// All bits that select a codec; exactly one must be set per chunk
    pub const COMPRESSION_MASK: u16 = Self::DZ
        | Self::ZLIB
        | Self::BZIP
        | Self::MP3
        | Self::JPEG
        | Self::ZERO
        | Self::COPYCOMP
        | Self::LZMA;

    const NAMES: [(u16, &'static str); 10] = [
        (Self::COMBUF, "COMBUF"),
        (Self::DZ, "DZ"),
        (Self::ZLIB, "ZLIB"),
        (Self::BZIP, "BZIP"),
        (Self::MP3, "MP3"),
        (Self::JPEG, "JPEG"),
        (Self::ZERO, "ZERO"),
        (Self::COPYCOMP, "COPYCOMP"),
        (Self::LZMA, "LZMA"),
        (Self::RANDOMACCESS, "RANDOMACCESS"),
    ];

    /// Create flags from a raw value
    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw flag value
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Check if a flag is set
    pub const fn has(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    /// The single compression bit of this chunk, validated
    ///
    /// Fails with [`Error::BadChunkFlags`] when no compression bit is set
    /// or more than one algorithm is named.
    pub fn compression_bit(self, chunk: u16) -> Result<u16> {
        let comp = self.0 & Self::COMPRESSION_MASK;
        if comp == 0 || !comp.is_power_of_two() {
            return Err(Error::BadChunkFlags(chunk));
        }
        Ok(comp)
    }

    /// Stable names of all set flags, for manifests and listings
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(bit, _)| self.has(*bit))
            .map(|(_, name)| *name)
            .collect()
    }

    /// Parse a single flag name back to its bit
    pub fn bit_for_name(name: &str) -> Option<u16> {
        Self::NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(bit, _)| *bit)
    }

    /// Rebuild flags from a list of names; `None` on any unknown name
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        let mut bits = 0u16;
        for name in names {
            bits |= Self::bit_for_name(name.as_ref())?;
        }
        Some(Self(bits))
    }
}

impl fmt::Display for ChunkFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            return write!(f, "{:#06x}", self.0);
        }
        write!(f, "{}", names.join("|"))
    }
}
