//! Header record wire format.
//!
//! ```text
//! +----------------+----------------------+------------------+
//! | magic (8 B)    | body length (u32 BE) | postcard body    |
//! +----------------+----------------------+------------------+
//! ```
//!
//! Records are self-delimiting so they can be concatenated into a header
//! archive or embedded after a package lead.

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::Header;

/// Magic bytes opening every header record.
pub const HEADER_MAGIC: [u8; 8] = [0x8e, 0xad, 0xe8, 0x01, 0x00, 0x00, 0x00, 0x00];

/// Upper bound on a record body, to reject garbage lengths before allocating.
pub const MAX_RECORD_LEN: usize = 32 * 1024 * 1024;

/// Errors raised while reading or writing header records.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Underlying stream failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The record does not start with [`HEADER_MAGIC`].
    #[error("bad header magic")]
    BadMagic,

    /// The stream ended in the middle of a record.
    #[error("truncated header record")]
    Truncated,

    /// The declared body length exceeds [`MAX_RECORD_LEN`].
    #[error("header record too large: {0} bytes")]
    TooLarge(usize),

    /// The body could not be decoded.
    #[error("header decode error: {0}")]
    Decode(#[from] postcard::Error),
}

/// Serialize one header record.
///
/// # Errors
///
/// Returns an error if encoding fails or the writer fails.
pub fn write_header<W: Write>(writer: &mut W, header: &Header) -> Result<(), CodecError> {
    let body = postcard::to_allocvec(header)?;
    if body.len() > MAX_RECORD_LEN {
        return Err(CodecError::TooLarge(body.len()));
    }
    writer.write_all(&HEADER_MAGIC)?;
    writer.write_all(&(body.len() as u32).to_be_bytes())?;
    writer.write_all(&body)?;
    Ok(())
}

/// Read one header record.
///
/// Returns `Ok(None)` when the stream is at a clean end (no bytes left before
/// the magic).
///
/// # Errors
///
/// Returns an error on a short, malformed or undecodable record.
pub fn read_header<R: Read>(reader: &mut R) -> Result<Option<Header>, CodecError> {
    let mut magic = [0u8; 8];
    match read_full(reader, &mut magic)? {
        0 => return Ok(None),
        n if n < magic.len() => return Err(CodecError::Truncated),
        _ => {}
    }
    if magic != HEADER_MAGIC {
        return Err(CodecError::BadMagic);
    }

    let mut len = [0u8; 4];
    if read_full(reader, &mut len)? < len.len() {
        return Err(CodecError::Truncated);
    }
    let len = u32::from_be_bytes(len) as usize;
    if len > MAX_RECORD_LEN {
        return Err(CodecError::TooLarge(len));
    }

    let mut body = vec![0u8; len];
    if read_full(reader, &mut body)? < len {
        return Err(CodecError::Truncated);
    }
    Ok(Some(postcard::from_bytes(&body)?))
}

/// Fill `buf` as far as the stream allows, returning the byte count.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_end_of_stream() {
        let mut empty: &[u8] = &[];
        assert!(read_header(&mut empty).unwrap().is_none());
    }

    #[test]
    fn test_concatenated_records() {
        let mut buf = Vec::new();
        write_header(&mut buf, &Header::new("a", "1", "1")).unwrap();
        write_header(&mut buf, &Header::new("b", "2", "1")).unwrap();

        let mut reader = buf.as_slice();
        assert_eq!(read_header(&mut reader).unwrap().unwrap().name, "a");
        assert_eq!(read_header(&mut reader).unwrap().unwrap().name, "b");
        assert!(read_header(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_instance_is_not_serialized() {
        let mut buf = Vec::new();
        write_header(&mut buf, &Header::new("a", "1", "1").with_instance(42)).unwrap();
        let h = read_header(&mut buf.as_slice()).unwrap().unwrap();
        assert_eq!(h.instance, 0);
    }

    #[test]
    fn test_truncated_and_bad_magic() {
        let mut buf = Vec::new();
        write_header(&mut buf, &Header::new("a", "1", "1")).unwrap();
        buf.truncate(buf.len() - 1);
        assert!(matches!(
            read_header(&mut buf.as_slice()),
            Err(CodecError::Truncated)
        ));

        let garbage = b"not a header record";
        assert!(matches!(
            read_header(&mut garbage.as_slice()),
            Err(CodecError::BadMagic)
        ));
    }
}
