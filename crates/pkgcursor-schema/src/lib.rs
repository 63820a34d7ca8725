//! Shared package header types and wire format for pkgcursor.

pub mod archive;
pub mod codec;
pub mod header;
pub mod package;
pub mod tag;

// Re-exports
pub use archive::{HeaderArchive, write_archive};
pub use codec::{CodecError, read_header, write_header};
pub use header::{FormatError, Header, HeaderRef};
pub use package::{PACKAGE_SUFFIX, PackageReadError, read_package_file, write_package_file};
pub use tag::Tag;

/// Magic bytes for ZSTD compression (Little Endian: 0xFD2FB528 -> 28 B5 2F FD)
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
