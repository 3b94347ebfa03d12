//! Filesystem implementations of the archive engine ports
//!
//! Volume discovery follows the suffix family of the original tooling:
//! `name.dz` is the main file and `name.d01`, `name.d02`, … are the
//! split volumes beside it. The engine itself only ever speaks volume
//! indices; all suffix and separator translation happens here.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use dz_archive::manifest::Manifest;
use dz_archive::{Error, PackSink, PackSource, Result, UnpackSink, UnpackSource};

/// Join a sanitized logical path onto a root directory
fn native(root: &Path, logical: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in logical.split('/') {
        path.push(part);
    }
    path
}

/// Split-volume path for index `i` (1-based) next to the main file
pub fn split_volume_path(main: &Path, index: u16) -> PathBuf {
    main.with_extension(format!("d{index:02}"))
}

/// Read side of an on-disk archive: the main file plus any split
/// volumes discovered beside it
pub struct FsUnpackSource {
    volumes: Vec<FsVolume>,
}

struct FsVolume {
    length: u64,
    file: Mutex<File>,
}

impl FsUnpackSource {
    /// Open the main file and every `.dNN` sibling that exists
    pub fn open(main: &Path) -> Result<Self> {
        let mut volumes = vec![FsVolume::open(main)?];
        for index in 1.. {
            let path = split_volume_path(main, index);
            if !path.exists() {
                break;
            }
            debug!("discovered split volume {}", path.display());
            volumes.push(FsVolume::open(&path)?);
        }
        Ok(Self { volumes })
    }
}

impl FsVolume {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self {
            length,
            file: Mutex::new(file),
        })
    }
}

impl UnpackSource for FsUnpackSource {
    fn volume_count(&self) -> u16 {
        self.volumes.len() as u16
    }

    fn volume_length(&self, volume: u16) -> Result<u64> {
        self.volumes
            .get(volume as usize)
            .map(|v| v.length)
            .ok_or(Error::VolumeMissing(volume))
    }

    fn read_at(&self, volume: u16, offset: u64, len: usize) -> Result<Vec<u8>> {
        let vol = self
            .volumes
            .get(volume as usize)
            .ok_or(Error::VolumeMissing(volume))?;
        let mut file = vol.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Extraction sink writing under a root directory
pub struct FsUnpackSink {
    root: PathBuf,
}

impl FsUnpackSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl UnpackSink for FsUnpackSink {
    fn create_dir(&self, logical: &str) -> Result<()> {
        fs::create_dir_all(native(&self.root, logical))?;
        Ok(())
    }

    fn write_file(&self, logical: &str, bytes: &[u8]) -> Result<()> {
        let path = native(&self.root, logical);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }

    fn finalize(&self, committed: bool) -> Result<()> {
        if !committed {
            warn!(
                "operation did not complete; partial output left under {}",
                self.root.display()
            );
        }
        Ok(())
    }
}

/// Pack input files read from a root directory
pub struct FsPackSource {
    root: PathBuf,
}

impl FsPackSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PackSource for FsPackSource {
    fn file_length(&self, logical: &str) -> Result<u64> {
        Ok(fs::metadata(native(&self.root, logical))?.len())
    }

    fn read_range(&self, logical: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut file = File::open(native(&self.root, logical))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Pack output volumes created under a directory
///
/// Discards every created volume when the operation does not commit, so
/// a failed pack leaves nothing behind.
pub struct FsPackSink {
    paths: Vec<PathBuf>,
    files: Vec<Option<File>>,
    offsets: Vec<u64>,
}

impl FsPackSink {
    /// `main` is the path of volume 0; `split_names` come from the
    /// manifest and are created beside it
    pub fn new(main: PathBuf, split_names: &[String], output_dir: &Path) -> Self {
        let mut paths = vec![main];
        for name in split_names {
            paths.push(output_dir.join(name));
        }
        let count = paths.len();
        Self {
            paths,
            files: (0..count).map(|_| None).collect(),
            offsets: vec![0; count],
        }
    }

    fn file(&mut self, volume: u16) -> Result<&mut File> {
        self.files
            .get_mut(volume as usize)
            .and_then(|f| f.as_mut())
            .ok_or(Error::VolumeMissing(volume))
    }
}

impl PackSink for FsPackSink {
    fn open_volume(&mut self, volume: u16) -> Result<()> {
        let idx = volume as usize;
        let path = self
            .paths
            .get(idx)
            .cloned()
            .ok_or(Error::VolumeMissing(volume))?;
        if self.files[idx].is_none() {
            debug!("creating volume {}", path.display());
            self.files[idx] = Some(File::create(path)?);
            self.offsets[idx] = 0;
        }
        Ok(())
    }

    fn write(&mut self, volume: u16, bytes: &[u8]) -> Result<u64> {
        let offset = self.offsets[volume as usize];
        let file = self.file(volume)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        self.offsets[volume as usize] = offset + bytes.len() as u64;
        Ok(offset)
    }

    fn write_at(&mut self, volume: u16, offset: u64, bytes: &[u8]) -> Result<()> {
        let file = self.file(volume)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        Ok(())
    }

    fn volume_offset(&self, volume: u16) -> u64 {
        self.offsets.get(volume as usize).copied().unwrap_or(0)
    }

    fn finalize(&mut self, _manifest: Option<&Manifest>, committed: bool) -> Result<()> {
        if committed {
            for file in self.files.iter_mut().flatten() {
                file.flush()?;
            }
            return Ok(());
        }

        // Failed or cancelled: no partial volume survives.
        for (idx, file) in self.files.iter_mut().enumerate() {
            if file.take().is_some() {
                warn!("discarding partial volume {}", self.paths[idx].display());
                let _ = fs::remove_file(&self.paths[idx]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_volume_paths() {
        let main = Path::new("res/game.dz");
        assert_eq!(split_volume_path(main, 1), Path::new("res/game.d01"));
        assert_eq!(split_volume_path(main, 12), Path::new("res/game.d12"));
    }

    #[test]
    fn test_native_translation() {
        let root = Path::new("out");
        let path = native(root, "maps/level1/tiles.bin");
        let expected: PathBuf = ["out", "maps", "level1", "tiles.bin"].iter().collect();
        assert_eq!(path, expected);
    }

    #[test]
    fn test_pack_sink_discards_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("out.dz");
        let mut sink = FsPackSink::new(main.clone(), &[], dir.path());

        sink.open_volume(0).unwrap();
        sink.write(0, b"partial").unwrap();
        assert!(main.exists());

        sink.finalize(None, false).unwrap();
        assert!(!main.exists());
    }

    #[test]
    fn test_unpack_source_reads_at_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("tiny.dz");
        fs::write(&main, b"0123456789").unwrap();

        let source = FsUnpackSource::open(&main).unwrap();
        assert_eq!(source.volume_count(), 1);
        assert_eq!(source.volume_length(0).unwrap(), 10);
        assert_eq!(source.read_at(0, 3, 4).unwrap(), b"3456");
    }
}
