//! Installed-package database interface and an in-memory implementation.
//!
//! The cursor only needs match iterators (optionally regex-filtered) and
//! the ability to block dependency indices while a transaction is checked.
//! [`MemoryDb`] provides both over a list of headers, loadable from a header
//! archive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use pkgcursor_schema::{Header, HeaderArchive, HeaderRef, Tag};
use regex::Regex;

use crate::error::{GiError, Result};

/// A database index an iterator can be opened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbIndex {
    /// Every installed header, in record order.
    Packages,
    /// Dependency cache consulted while resolving requirements.
    Depends,
    /// Headers carrying a value for this tag.
    Tag(Tag),
}

impl std::fmt::Display for DbIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Packages => write!(f, "packages"),
            Self::Depends => write!(f, "depends"),
            Self::Tag(tag) => write!(f, "{tag}"),
        }
    }
}

/// An installed-package database.
pub trait Database: std::fmt::Debug {
    /// Open an iterator over `index`, restricted to records whose value
    /// equals `key` when one is given.
    ///
    /// Returns `None` when nothing matches or the index is blocked.
    fn open_iterator(&self, index: DbIndex, key: Option<&[u8]>) -> Option<Box<dyn MatchIterator>>;

    /// Make `index` unavailable until [`Database::unblock_index`] is called.
    fn block_index(&self, index: DbIndex);

    /// Undo one [`Database::block_index`].
    fn unblock_index(&self, index: DbIndex);

    /// Whether `index` is currently blocked.
    fn is_blocked(&self, index: DbIndex) -> bool;
}

/// A live iterator over database records. Dropping it frees it.
pub trait MatchIterator: std::fmt::Debug {
    /// Only yield headers where some value of `tag` matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`GiError::BadPattern`] if the pattern does not compile.
    fn set_regex(&mut self, tag: Tag, pattern: &str) -> Result<()>;

    /// Next matching header, or `None` when the iterator is exhausted.
    fn next_header(&mut self) -> Option<HeaderRef>;

    /// Record offset of the header last returned.
    fn offset(&self) -> u32;
}

/// Database held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryDb {
    headers: Vec<HeaderRef>,
    blocked: RefCell<HashMap<DbIndex, usize>>,
}

impl MemoryDb {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a database from headers, assigning offsets from 1.
    pub fn from_headers<I: IntoIterator<Item = Header>>(headers: I) -> Self {
        let mut db = Self::new();
        for header in headers {
            db.add(header);
        }
        db
    }

    /// Load every header of a header archive.
    ///
    /// # Errors
    ///
    /// Returns [`GiError::Archive`] if the archive cannot be opened or a
    /// record is damaged.
    pub fn load_archive(path: &Path) -> Result<Self> {
        let archive_err = |source| GiError::Archive {
            path: path.to_path_buf(),
            source,
        };
        let mut archive = HeaderArchive::open(path).map_err(archive_err)?;
        let mut db = Self::new();
        while let Some(header) = archive.next_header().map_err(archive_err)? {
            db.add(header);
        }
        tracing::debug!("Loaded {} headers from {}", db.len(), path.display());
        Ok(db)
    }

    /// Append a header, returning its record offset.
    pub fn add(&mut self, mut header: Header) -> u32 {
        let offset = self.headers.len() as u32 + 1;
        header.instance = offset;
        self.headers.push(Arc::new(header));
        offset
    }

    /// Number of installed headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether the database holds no headers.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl Database for MemoryDb {
    fn open_iterator(&self, index: DbIndex, key: Option<&[u8]>) -> Option<Box<dyn MatchIterator>> {
        if self.is_blocked(index) {
            tracing::debug!("Index {index} is blocked");
            return None;
        }

        let key = key.map(String::from_utf8_lossy);
        let records: Vec<HeaderRef> = match index {
            DbIndex::Packages => self.headers.clone(),
            DbIndex::Depends => return None,
            DbIndex::Tag(tag) => {
                let records: Vec<HeaderRef> = self
                    .headers
                    .iter()
                    .filter(|h| {
                        let values = h.values(tag);
                        match &key {
                            Some(key) => values.iter().any(|v| v == key),
                            None => !values.is_empty(),
                        }
                    })
                    .cloned()
                    .collect();
                if records.is_empty() {
                    return None;
                }
                records
            }
        };

        Some(Box::new(MemoryIterator {
            records,
            pos: 0,
            offset: 0,
            filters: Vec::new(),
        }))
    }

    fn block_index(&self, index: DbIndex) {
        *self.blocked.borrow_mut().entry(index).or_default() += 1;
    }

    fn unblock_index(&self, index: DbIndex) {
        let mut blocked = self.blocked.borrow_mut();
        if let Some(count) = blocked.get_mut(&index) {
            *count -= 1;
            if *count == 0 {
                blocked.remove(&index);
            }
        }
    }

    fn is_blocked(&self, index: DbIndex) -> bool {
        self.blocked.borrow().contains_key(&index)
    }
}

#[derive(Debug)]
struct MemoryIterator {
    records: Vec<HeaderRef>,
    pos: usize,
    offset: u32,
    filters: Vec<(Tag, Regex)>,
}

impl MemoryIterator {
    fn matches(&self, header: &Header) -> bool {
        self.filters
            .iter()
            .all(|(tag, re)| header.values(*tag).iter().any(|v| re.is_match(v)))
    }
}

impl MatchIterator for MemoryIterator {
    fn set_regex(&mut self, tag: Tag, pattern: &str) -> Result<()> {
        let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| GiError::BadPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.filters.push((tag, re));
        Ok(())
    }

    fn next_header(&mut self) -> Option<HeaderRef> {
        while let Some(header) = self.records.get(self.pos) {
            self.pos += 1;
            if self.matches(header) {
                self.offset = header.instance;
                return Some(Arc::clone(header));
            }
        }
        None
    }

    fn offset(&self) -> u32 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> MemoryDb {
        MemoryDb::from_headers([
            Header::new("bash", "5.2", "1").with_provides(["/bin/sh"]),
            Header::new("zsh", "5.9", "2"),
            Header::new("bash-completion", "2.11", "1").with_requires(["bash"]),
        ])
    }

    fn drain(mut it: Box<dyn MatchIterator>) -> Vec<(String, u32)> {
        let mut out = Vec::new();
        while let Some(h) = it.next_header() {
            out.push((h.name.clone(), it.offset()));
        }
        out
    }

    #[test]
    fn test_keyed_lookup() {
        let db = db();
        let it = db
            .open_iterator(DbIndex::Tag(Tag::Name), Some(b"bash".as_slice()))
            .unwrap();
        assert_eq!(drain(it), vec![("bash".to_string(), 1)]);

        let it = db
            .open_iterator(DbIndex::Tag(Tag::ProvideName), Some(b"/bin/sh".as_slice()))
            .unwrap();
        assert_eq!(drain(it), vec![("bash".to_string(), 1)]);
    }

    #[test]
    fn test_no_match_yields_no_iterator() {
        let db = db();
        assert!(
            db.open_iterator(DbIndex::Tag(Tag::Name), Some(b"fish".as_slice()))
                .is_none()
        );
    }

    #[test]
    fn test_regex_filters_are_anchored() {
        let db = db();
        let mut it = db.open_iterator(DbIndex::Packages, None).unwrap();
        it.set_regex(Tag::Name, "bash").unwrap();
        assert_eq!(drain(it), vec![("bash".to_string(), 1)]);

        let mut it = db.open_iterator(DbIndex::Packages, None).unwrap();
        it.set_regex(Tag::Name, "bash.*").unwrap();
        it.set_regex(Tag::Version, "2\\..*").unwrap();
        assert_eq!(drain(it), vec![("bash-completion".to_string(), 3)]);
    }

    #[test]
    fn test_bad_regex() {
        let db = db();
        let mut it = db.open_iterator(DbIndex::Packages, None).unwrap();
        assert!(matches!(
            it.set_regex(Tag::Name, "("),
            Err(GiError::BadPattern { .. })
        ));
    }

    #[test]
    fn test_blocking_is_counted() {
        let db = db();
        let index = DbIndex::Tag(Tag::ProvideName);
        db.block_index(index);
        db.block_index(index);
        db.unblock_index(index);
        assert!(db.is_blocked(index));
        assert!(db.open_iterator(index, Some(b"bash".as_slice())).is_none());
        db.unblock_index(index);
        assert!(!db.is_blocked(index));
        assert!(db.open_iterator(index, Some(b"bash".as_slice())).is_some());
    }
}
