//! Header archives (hdlists): concatenated header records, optionally
//! zstd-compressed as a whole.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::codec::{self, CodecError};
use crate::{Header, ZSTD_MAGIC};

/// Sequential reader over a header archive.
pub struct HeaderArchive {
    path: PathBuf,
    reader: Box<dyn Read>,
    compressed: bool,
}

impl std::fmt::Debug for HeaderArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderArchive")
            .field("path", &self.path)
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

impl HeaderArchive {
    /// Open an archive, auto-detecting zstd compression from the frame magic.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the decoder cannot be
    /// initialised.
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        let mut buffered = BufReader::new(File::open(path)?);
        let compressed = buffered.fill_buf()?.starts_with(&ZSTD_MAGIC);

        let reader: Box<dyn Read> = if compressed {
            Box::new(zstd::stream::read::Decoder::with_buffer(buffered)?)
        } else {
            Box::new(buffered)
        };

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            compressed,
        })
    }

    /// Path the archive was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the archive is zstd-compressed.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Read the next header, or `None` at the end of the archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the next record is malformed.
    pub fn next_header(&mut self) -> Result<Option<Header>, CodecError> {
        codec::read_header(&mut self.reader)
    }
}

/// Write `headers` to a new archive at `path`, returning the record count.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_archive<'a, I>(path: &Path, headers: I, compress: bool) -> Result<usize, CodecError>
where
    I: IntoIterator<Item = &'a Header>,
{
    let file = BufWriter::new(File::create(path)?);
    let mut count = 0;

    if compress {
        let mut encoder = zstd::stream::write::Encoder::new(file, 3)?;
        for header in headers {
            codec::write_header(&mut encoder, header)?;
            count += 1;
        }
        encoder.finish()?.flush()?;
    } else {
        let mut writer = file;
        for header in headers {
            codec::write_header(&mut writer, header)?;
            count += 1;
        }
        writer.flush()?;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<Header> {
        vec![
            Header::new("a", "1", "1"),
            Header::new("b", "1", "1"),
            Header::new("c", "1", "1"),
        ]
    }

    #[test]
    fn test_plain_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hdlist");
        assert_eq!(write_archive(&path, &headers(), false).unwrap(), 3);

        let mut archive = HeaderArchive::open(&path).unwrap();
        assert!(!archive.is_compressed());
        let mut names = Vec::new();
        while let Some(h) = archive.next_header().unwrap() {
            names.push(h.name);
        }
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_compressed_archive_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hdlist.zst");
        write_archive(&path, &headers(), true).unwrap();

        let mut archive = HeaderArchive::open(&path).unwrap();
        assert!(archive.is_compressed());
        assert_eq!(archive.next_header().unwrap().unwrap().name, "a");
        assert_eq!(archive.next_header().unwrap().unwrap().name, "b");
        assert_eq!(archive.next_header().unwrap().unwrap().name, "c");
        assert!(archive.next_header().unwrap().is_none());
    }

    #[test]
    fn test_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();

        let mut archive = HeaderArchive::open(&path).unwrap();
        assert!(archive.next_header().unwrap().is_none());
    }
}
