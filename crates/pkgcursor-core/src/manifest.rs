//! Manifests: plain text files listing further worklist entries.
//!
//! A manifest holds whitespace-separated paths or glob patterns; `#` starts a
//! comment running to the end of the line.

use std::path::Path;

use thiserror::Error;

use crate::args::{GlobExpander, escape_spaces};

/// Why a file could not be used as a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The file could not be read.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The file holds binary data.
    #[error("not a text file")]
    Binary,

    /// The file lists nothing.
    #[error("no entries")]
    Empty,

    /// The manifest was already expanded in this run.
    #[error("manifest lists itself")]
    Cycle,
}

/// Parses a file into worklist entries.
pub trait ManifestReader: std::fmt::Debug {
    /// Entries listed by the manifest at `path`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, binary, or lists nothing.
    fn parse(&self, path: &Path) -> Result<Vec<String>, ManifestError>;
}

/// Reads manifests from disk, expanding globs in their entries.
#[derive(Debug)]
pub struct FileManifestReader<G> {
    glob: G,
}

impl<G: GlobExpander> FileManifestReader<G> {
    /// Create a reader expanding entries with `glob`.
    pub fn new(glob: G) -> Self {
        Self { glob }
    }
}

impl<G: GlobExpander> ManifestReader for FileManifestReader<G> {
    fn parse(&self, path: &Path) -> Result<Vec<String>, ManifestError> {
        let bytes = std::fs::read(path)?;
        if bytes.contains(&0) {
            return Err(ManifestError::Binary);
        }
        let text = String::from_utf8(bytes).map_err(|_| ManifestError::Binary)?;

        let entries: Vec<String> = text
            .lines()
            .map(|line| line.split_once('#').map_or(line, |(before, _)| before))
            .flat_map(str::split_whitespace)
            .flat_map(|token| self.glob.expand(&escape_spaces(token)))
            .collect();

        if entries.is_empty() {
            return Err(ManifestError::Empty);
        }
        tracing::debug!("Manifest {} lists {} entries", path.display(), entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::FsGlob;

    fn reader() -> FileManifestReader<FsGlob> {
        FileManifestReader::new(FsGlob)
    }

    #[test]
    fn test_parse_entries_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list");
        std::fs::write(&path, "# packages\na.rpm b.rpm\n\n  c.rpm # trailing\n").unwrap();

        assert_eq!(reader().parse(&path).unwrap(), vec!["a.rpm", "b.rpm", "c.rpm"]);
    }

    #[test]
    fn test_parse_expands_globs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.rpm"), b"").unwrap();
        std::fs::write(dir.path().join("y.rpm"), b"").unwrap();
        let path = dir.path().join("list");
        std::fs::write(&path, format!("{}/*.rpm\n", dir.path().display())).unwrap();

        let entries = reader().parse(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].ends_with("x.rpm"));
    }

    #[test]
    fn test_empty_and_binary_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        std::fs::write(&empty, "# nothing here\n").unwrap();
        assert!(matches!(reader().parse(&empty), Err(ManifestError::Empty)));

        let binary = dir.path().join("bin");
        std::fs::write(&binary, [0xed, 0xab, 0x00, 0x01]).unwrap();
        assert!(matches!(reader().parse(&binary), Err(ManifestError::Binary)));
    }
}
