//! `dz list` — print an archive's contents

use std::fs::File;
use std::io::BufReader;

use dz_format::{ChunkFlags, parser};

use crate::ListArgs;

pub fn handle(args: &ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(&args.archive)?;
    let length = file.metadata()?.len();
    let metadata = parser::parse_metadata(BufReader::new(file), length)?;

    println!(
        "{} v{}: {} files, {} directories, {} chunks, {} volume(s)",
        args.archive.display(),
        metadata.version,
        metadata.user_files.len(),
        metadata.directories.len(),
        metadata.chunks.len(),
        metadata.num_archive_files(),
    );
    println!(
        "{:<5} | {:>10} | {:>10} | {:<12} | Path",
        "Idx", "Size", "Packed", "Codec"
    );
    println!("{:-<5}-+-{:-<10}-+-{:-<10}-+-{:-<12}-+-{:-<30}", "", "", "", "", "");

    for (i, entry) in metadata.map.iter().enumerate() {
        let name = &metadata.user_files[i];
        let dir = metadata
            .directories
            .get(entry.directory as usize)
            .map(String::as_str)
            .unwrap_or("");

        let path = if dir.is_empty() {
            name.clone()
        } else {
            format!("{}/{name}", dir.replace('\\', "/"))
        };

        let mut size = 0u64;
        let mut packed = 0u64;
        let mut codec = "-";
        for (pos, &cid) in entry.chunks.iter().enumerate() {
            if let Some(chunk) = metadata.chunks.get(cid as usize) {
                size += u64::from(chunk.decompressed_length);
                packed += u64::from(chunk.compressed_length);
                if pos == 0 {
                    if let Ok(bit) = chunk.flags.compression_bit(cid) {
                        codec = ChunkFlags::new(bit).names()[0];
                    }
                }
            }
        }

        println!("{i:<5} | {size:>10} | {packed:>10} | {codec:<12} | {path}");
    }

    if !metadata.volume_names.is_empty() {
        println!("\nSplit volumes: {}", metadata.volume_names.join(", "));
    }

    Ok(())
}
