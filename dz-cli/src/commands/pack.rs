//! `dz pack` — build an archive from a manifest and its file tree

use std::fs;
use std::path::Path;
use tracing::info;

use dz_archive::{CancelToken, NoopProgress, PackOptions, Progress, pack};

use crate::fsio::{FsPackSink, FsPackSource};
use crate::progress_bar::BarProgress;
use crate::{PackArgs, manifest_file};

pub fn handle(args: &PackArgs, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = manifest_file::load(&args.manifest)?;

    let base_dir = args
        .manifest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let out_dir = args.output.clone().unwrap_or_else(|| base_dir.clone());
    fs::create_dir_all(&out_dir)?;

    let stem = args
        .manifest
        .file_stem()
        .ok_or("manifest path has no file name")?
        .to_string_lossy()
        .to_string();
    let main_volume = out_dir.join(format!("{stem}.dz"));

    let source = FsPackSource::new(&base_dir);
    let mut sink = FsPackSink::new(main_volume.clone(), &manifest.volumes, &out_dir);
    let progress: Box<dyn Progress> = if quiet {
        Box::new(NoopProgress)
    } else {
        Box::new(BarProgress::new())
    };

    let options = PackOptions {
        split_threshold: args.split_size,
        cancel: CancelToken::new(),
    };

    info!(
        "packing {} files into {}",
        manifest.files.len(),
        main_volume.display()
    );
    pack(&manifest, &source, &mut sink, progress.as_ref(), &options)?;

    Ok(())
}
