//! Hash command

use anyhow::{Context, Result};
use formulary_core::io::download::hash_file;
use std::path::PathBuf;

/// Print the SHA256 of each file, in `sha256sum` format.
pub fn hash(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let digest =
            hash_file(file).with_context(|| format!("Failed to hash {}", file.display()))?;
        println!("{digest}  {}", file.display());
    }
    Ok(())
}
