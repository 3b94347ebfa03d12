//! In-memory port implementations
//!
//! Back the four ports with plain byte vectors. Used throughout the
//! integration tests and handy for embedders that already hold archive
//! bytes in memory.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::Mutex;

use crate::manifest::Manifest;
use crate::ports::{PackSink, PackSource, UnpackSink, UnpackSource};
use crate::{Error, Result};

fn eof(what: &str) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof, what.to_string()))
}

/// Archive volumes held as byte vectors
#[derive(Debug, Clone, Default)]
pub struct MemoryUnpackSource {
    volumes: Vec<Vec<u8>>,
}

impl MemoryUnpackSource {
    pub fn new(volumes: Vec<Vec<u8>>) -> Self {
        Self { volumes }
    }
}

impl UnpackSource for MemoryUnpackSource {
    fn volume_count(&self) -> u16 {
        self.volumes.len() as u16
    }

    fn volume_length(&self, volume: u16) -> Result<u64> {
        self.volumes
            .get(volume as usize)
            .map(|v| v.len() as u64)
            .ok_or(Error::VolumeMissing(volume))
    }

    fn read_at(&self, volume: u16, offset: u64, len: usize) -> Result<Vec<u8>> {
        let data = self
            .volumes
            .get(volume as usize)
            .ok_or(Error::VolumeMissing(volume))?;
        let start = offset as usize;
        let end = start.checked_add(len).ok_or_else(|| eof("read overflow"))?;
        if end > data.len() {
            return Err(eof("read past end of volume"));
        }
        Ok(data[start..end].to_vec())
    }
}

/// Extraction sink collecting files into a map
#[derive(Debug, Default)]
pub struct MemoryUnpackSink {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    dirs: Mutex<BTreeSet<String>>,
    finalized: Mutex<Option<bool>>,
}

impl MemoryUnpackSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of an extracted file, if present
    pub fn file(&self, logical: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(logical).cloned()
    }

    /// All extracted paths in sorted order
    pub fn paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn has_dir(&self, logical: &str) -> bool {
        self.dirs.lock().unwrap().contains(logical)
    }

    /// `Some(committed)` once `finalize` ran
    pub fn finalized(&self) -> Option<bool> {
        *self.finalized.lock().unwrap()
    }
}

impl UnpackSink for MemoryUnpackSink {
    fn create_dir(&self, logical: &str) -> Result<()> {
        self.dirs.lock().unwrap().insert(logical.to_string());
        Ok(())
    }

    fn write_file(&self, logical: &str, bytes: &[u8]) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(logical.to_string(), bytes.to_vec());
        Ok(())
    }

    fn finalize(&self, committed: bool) -> Result<()> {
        *self.finalized.lock().unwrap() = Some(committed);
        Ok(())
    }
}

/// Pack input files held as byte vectors
#[derive(Debug, Clone, Default)]
pub struct MemoryPackSource {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryPackSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, logical: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(logical.into(), bytes);
        self
    }

    fn get(&self, logical: &str) -> Result<&Vec<u8>> {
        self.files.get(logical).ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such source file: {logical}"),
            ))
        })
    }
}

impl PackSource for MemoryPackSource {
    fn file_length(&self, logical: &str) -> Result<u64> {
        Ok(self.get(logical)?.len() as u64)
    }

    fn read_range(&self, logical: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let data = self.get(logical)?;
        let start = offset as usize;
        let end = start.checked_add(len).ok_or_else(|| eof("read overflow"))?;
        if end > data.len() {
            return Err(eof("read past end of source file"));
        }
        Ok(data[start..end].to_vec())
    }
}

/// Pack output volumes held as byte vectors
#[derive(Debug, Default)]
pub struct MemoryPackSink {
    volumes: Vec<Option<Vec<u8>>>,
    manifest: Option<Manifest>,
    finalized: Option<bool>,
}

impl MemoryPackSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of a written volume, if it was opened
    pub fn volume(&self, volume: u16) -> Option<&[u8]> {
        self.volumes
            .get(volume as usize)
            .and_then(|v| v.as_deref())
    }

    /// Number of volumes that were opened
    pub fn open_count(&self) -> usize {
        self.volumes.iter().filter(|v| v.is_some()).count()
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn finalized(&self) -> Option<bool> {
        self.finalized
    }

    fn buffer(&mut self, volume: u16) -> Result<&mut Vec<u8>> {
        self.volumes
            .get_mut(volume as usize)
            .and_then(|v| v.as_mut())
            .ok_or(Error::VolumeMissing(volume))
    }
}

impl PackSink for MemoryPackSink {
    fn open_volume(&mut self, volume: u16) -> Result<()> {
        let idx = volume as usize;
        if self.volumes.len() <= idx {
            self.volumes.resize(idx + 1, None);
        }
        if self.volumes[idx].is_none() {
            self.volumes[idx] = Some(Vec::new());
        }
        Ok(())
    }

    fn write(&mut self, volume: u16, bytes: &[u8]) -> Result<u64> {
        let buffer = self.buffer(volume)?;
        let offset = buffer.len() as u64;
        buffer.extend_from_slice(bytes);
        Ok(offset)
    }

    fn write_at(&mut self, volume: u16, offset: u64, bytes: &[u8]) -> Result<()> {
        let buffer = self.buffer(volume)?;
        let start = offset as usize;
        let end = start + bytes.len();
        if buffer.len() < end {
            buffer.resize(end, 0);
        }
        buffer[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn volume_offset(&self, volume: u16) -> u64 {
        self.volumes
            .get(volume as usize)
            .and_then(|v| v.as_ref())
            .map(|v| v.len() as u64)
            .unwrap_or(0)
    }

    fn finalize(&mut self, manifest: Option<&Manifest>, committed: bool) -> Result<()> {
        self.manifest = manifest.cloned();
        self.finalized = Some(committed);
        Ok(())
    }
}
