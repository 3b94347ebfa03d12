//! Library side of the `dz` command-line tool
//!
//! Hosts the filesystem implementations of the archive engine's ports,
//! the TOML manifest codec, the indicatif progress observer and the
//! subcommand handlers. `main.rs` only parses arguments and dispatches.

pub mod commands;
pub mod fsio;
pub mod manifest_file;
pub mod progress_bar;

use clap::Args;
use std::path::PathBuf;

/// Arguments for `dz unpack`
#[derive(Args, Debug)]
pub struct UnpackArgs {
    /// The archive to unpack (split volumes are discovered beside it)
    pub archive: PathBuf,

    /// Output directory (defaults to the archive name without suffix)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep raw payloads of undecodable chunks as `.raw` sidecars
    /// instead of failing
    #[arg(long)]
    pub keep_raw: bool,

    /// Manifest from an earlier unpack, supplying per-file lengths for
    /// archives with chunks spanning several files
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

/// Arguments for `dz pack`
#[derive(Args, Debug)]
pub struct PackArgs {
    /// Manifest describing the archive to build; source files are
    /// resolved relative to its directory
    pub manifest: PathBuf,

    /// Output directory for the volumes (defaults to the manifest's
    /// directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Roll over to the next declared volume when one would exceed this
    /// many bytes
    #[arg(long, value_name = "BYTES")]
    pub split_size: Option<u64>,
}

/// Arguments for `dz list`
#[derive(Args, Debug)]
pub struct ListArgs {
    /// The archive to inspect
    pub archive: PathBuf,
}
