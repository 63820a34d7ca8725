//! Generalized package iterator.
//!
//! One [`Cursor`] enumerates package headers from a database lookup, a
//! filtered database scan, a transaction, a header archive, a list of
//! package files and manifests, or a directory walk.

pub mod args;
pub mod config;
pub mod cursor;
pub mod db;
pub mod error;
mod finalize;
pub mod flags;
pub mod manifest;
pub mod paths;
pub mod source;
pub mod ts;
pub mod walk;
pub mod worklist;

pub use args::{FsGlob, GlobExpander, escape_spaces};
pub use config::{CursorConfig, WalkOptions};
pub use cursor::{Cursor, Status};
pub use db::{Database, DbIndex, MatchIterator, MemoryDb};
pub use error::{GiError, Result};
pub use flags::GiFlags;
pub use manifest::{FileManifestReader, ManifestError, ManifestReader};
pub use source::SourceKind;
pub use ts::{Element, ElementKey, ElementKind, Goal, Orderer, Problem, TopoOrder, Transaction};
pub use walk::{FsWalk, PackageSuffixFilter, PathFilter, Visit, WalkEntry};
pub use worklist::Worklist;
