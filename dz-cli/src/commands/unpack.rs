//! `dz unpack` — extract an archive and emit its manifest

use std::fs;
use std::path::PathBuf;
use tracing::info;

use dz_archive::{CancelToken, NoopProgress, Progress, UnpackOptions, unpack};

use crate::fsio::{FsUnpackSink, FsUnpackSource};
use crate::progress_bar::BarProgress;
use crate::{UnpackArgs, manifest_file};

pub fn handle(args: &UnpackArgs, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let stem = args
        .archive
        .file_stem()
        .ok_or("archive path has no file name")?
        .to_string_lossy()
        .to_string();

    let out_dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&stem));
    fs::create_dir_all(&out_dir)?;

    let file_lengths = match &args.manifest {
        Some(path) => Some(manifest_file::load(path)?.file_lengths()),
        None => None,
    };

    let source = FsUnpackSource::open(&args.archive)?;
    let sink = FsUnpackSink::new(&out_dir);
    let progress: Box<dyn Progress> = if quiet {
        Box::new(NoopProgress)
    } else {
        Box::new(BarProgress::new())
    };

    let options = UnpackOptions {
        keep_raw: args.keep_raw,
        file_lengths,
        cancel: CancelToken::new(),
    };

    info!("unpacking {} into {}", args.archive.display(), out_dir.display());
    let manifest = unpack(&source, &sink, progress.as_ref(), &options)?;

    let manifest_path = out_dir.join(format!("{stem}.toml"));
    manifest_file::save(&manifest_path, &manifest)?;
    info!("manifest written to {}", manifest_path.display());

    Ok(())
}
