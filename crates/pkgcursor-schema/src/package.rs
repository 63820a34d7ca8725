//! Package files: a lead magic followed by one header record.
//!
//! Only the header is read; whatever follows it (signatures, payload) is
//! ignored.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

use crate::Header;
use crate::codec::{self, CodecError};

/// Magic bytes at the start of every package file.
pub const LEAD_MAGIC: [u8; 4] = [0xed, 0xab, 0xee, 0xdb];

/// Default filename suffix of package files.
pub const PACKAGE_SUFFIX: &str = ".rpm";

/// Errors raised while reading a package file.
#[derive(Error, Debug)]
pub enum PackageReadError {
    /// The file could not be opened or read.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with [`LEAD_MAGIC`].
    #[error("not a package file")]
    NotAPackage,

    /// The lead is present but the header record is damaged.
    #[error("corrupt package header: {0}")]
    Corrupt(#[source] CodecError),
}

impl PackageReadError {
    /// Whether the failure was caused by the path not existing.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }

    /// Whether the file is worth re-reading as a manifest.
    ///
    /// Anything that exists but failed to read as a package qualifies; a
    /// path that does not exist never does.
    pub fn may_be_manifest(&self) -> bool {
        !self.is_missing()
    }
}

/// Read the header of the package file at `path`.
///
/// # Errors
///
/// Returns [`PackageReadError`] describing why the file is not a readable
/// package.
pub fn read_package_file(path: &Path) -> Result<Header, PackageReadError> {
    let file = File::open(path)?;
    read_package(&mut BufReader::new(file))
}

/// Read a package header from an open stream.
///
/// # Errors
///
/// See [`read_package_file`].
pub fn read_package<R: Read>(reader: &mut R) -> Result<Header, PackageReadError> {
    let mut lead = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut lead) {
        return match e.kind() {
            io::ErrorKind::UnexpectedEof => Err(PackageReadError::NotAPackage),
            _ => Err(PackageReadError::Io(e)),
        };
    }
    if lead != LEAD_MAGIC {
        return Err(PackageReadError::NotAPackage);
    }

    match codec::read_header(reader) {
        Ok(Some(header)) => Ok(header),
        Ok(None) => Err(PackageReadError::Corrupt(CodecError::Truncated)),
        Err(e) => Err(PackageReadError::Corrupt(e)),
    }
}

/// Write a package file containing only `header`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_package_file(path: &Path, header: &Header) -> Result<(), CodecError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&LEAD_MAGIC)?;
    codec::write_header(&mut writer, header)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello-1.0-1.noarch.rpm");
        write_package_file(&path, &Header::new("hello", "1.0", "1")).unwrap();

        let h = read_package_file(&path).unwrap();
        assert_eq!(h.nevra(), "hello-1.0-1.noarch");
    }

    #[test]
    fn test_missing_is_not_a_manifest_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_package_file(&dir.path().join("absent.rpm")).unwrap_err();
        assert!(err.is_missing());
        assert!(!err.may_be_manifest());
    }

    #[test]
    fn test_text_file_may_be_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.rpm");
        std::fs::write(&path, "a.rpm\nb.rpm\n").unwrap();

        let err = read_package_file(&path).unwrap_err();
        assert!(matches!(err, PackageReadError::NotAPackage));
        assert!(err.may_be_manifest());
    }

    #[test]
    fn test_short_file_is_not_a_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny");
        std::fs::write(&path, "ab").unwrap();
        assert!(matches!(
            read_package_file(&path),
            Err(PackageReadError::NotAPackage)
        ));
    }
}
