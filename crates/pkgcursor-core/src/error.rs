//! Error types for the cursor and its collaborators

use std::path::PathBuf;

use pkgcursor_schema::{CodecError, PackageReadError};
use thiserror::Error;

use crate::manifest::ManifestError;

/// Result type alias using [`GiError`]
pub type Result<T> = std::result::Result<T, GiError>;

/// Hard failures returned by [`Cursor::next`](crate::Cursor::next).
///
/// Recoverable end-of-source is not an error; it is reported as
/// [`Status::NotFound`](crate::Status::NotFound).
#[derive(Error, Debug)]
pub enum GiError {
    /// A `TAG=pattern` filter names a tag that does not exist.
    #[error("unknown tag: \"{0}\"")]
    UnknownTag(String),

    /// A filter pattern is not a valid regular expression.
    #[error("invalid pattern \"{pattern}\": {source}")]
    BadPattern {
        /// The offending pattern.
        pattern: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },

    /// A worklist entry names a path that does not exist.
    #[error("{}: no such file or directory", path.display())]
    MissingPath {
        /// The missing path.
        path: PathBuf,
    },

    /// A worklist entry is neither a package nor an acceptable manifest.
    #[error("{}: not a package", path.display())]
    NotAPackage {
        /// The rejected path.
        path: PathBuf,
    },

    /// A package file could not be read.
    #[error("{}: {source}", path.display())]
    Package {
        /// The package path.
        path: PathBuf,
        /// Read failure.
        #[source]
        source: PackageReadError,
    },

    /// A manifest could not be expanded.
    #[error("{}: manifest: {source}", path.display())]
    Manifest {
        /// The manifest path.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: ManifestError,
    },

    /// A header archive could not be opened.
    #[error("open of {} failed: {source}", path.display())]
    Archive {
        /// The archive path.
        path: PathBuf,
        /// Open failure.
        #[source]
        source: CodecError,
    },

    /// The transaction ordering callback failed.
    #[error("transaction ordering failed: {0}")]
    Order(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O failure outside a specific backend.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GiError {
    /// Create a configuration error.
    pub fn config(msg: impl std::fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }

    /// Classify a package read failure for `path`.
    pub(crate) fn package(path: impl Into<PathBuf>, source: PackageReadError) -> Self {
        let path = path.into();
        match source {
            source if source.is_missing() => Self::MissingPath { path },
            PackageReadError::NotAPackage => Self::NotAPackage { path },
            source => Self::Package { path, source },
        }
    }
}
