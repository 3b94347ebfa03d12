//! TOML encoding of the archive manifest

use std::fs;
use std::path::Path;

use dz_archive::Manifest;

/// Read a manifest from a TOML file
pub fn load(path: &Path) -> Result<Manifest, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read manifest {}: {e}", path.display()))?;
    let manifest = toml::from_str(&text)
        .map_err(|e| format!("cannot parse manifest {}: {e}", path.display()))?;
    Ok(manifest)
}

/// Write a manifest as pretty TOML
pub fn save(path: &Path, manifest: &Manifest) -> Result<(), Box<dyn std::error::Error>> {
    let text = toml::to_string_pretty(manifest)?;
    fs::write(path, text)
        .map_err(|e| format!("cannot write manifest {}: {e}", path.display()))?;
    Ok(())
}
