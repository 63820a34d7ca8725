//! Hdlist command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pkgcursor_schema::{Header, read_package_file, write_archive};

use super::pack::load_desc;

fn load_input(path: &Path) -> Result<Header> {
    if path.extension().is_some_and(|ext| ext == "toml") {
        return load_desc(path);
    }
    read_package_file(path).with_context(|| format!("Failed to read package {}", path.display()))
}

/// Write a header archive from package files and header descriptions.
pub fn hdlist(inputs: &[PathBuf], output: &Path, compress: bool) -> Result<()> {
    let headers = inputs
        .iter()
        .map(|p| load_input(p))
        .collect::<Result<Vec<_>>>()?;

    let count = write_archive(output, headers.iter(), compress)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!("Wrote {count} headers to {}", output.display());
    Ok(())
}
