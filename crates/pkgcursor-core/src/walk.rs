//! Recursive filesystem walk over several roots, and the filter deciding
//! which entries are package candidates.

use std::collections::VecDeque;
use std::path::PathBuf;

use pkgcursor_schema::PACKAGE_SUFFIX;
use walkdir::WalkDir;

use crate::config::WalkOptions;

/// What kind of node a walk entry is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    /// Regular file.
    File,
    /// Directory (pre-order).
    Dir,
    /// Symbolic link not followed.
    Symlink,
    /// Any other node type.
    Other,
    /// The entry could not be read, or a link cycle was found.
    Error(String),
}

impl Visit {
    /// Short code in the style of fts(3) visit types.
    pub fn code(&self) -> &'static str {
        match self {
            Self::File => "F",
            Self::Dir => "D",
            Self::Symlink => "SL",
            Self::Other => "DEFAULT",
            Self::Error(_) => "ERR",
        }
    }
}

/// One node produced by [`FsWalk`].
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Path of the node.
    pub path: PathBuf,
    /// Node kind.
    pub visit: Visit,
}

/// Decides whether a walk entry is handed to the package reader.
pub trait PathFilter: std::fmt::Debug {
    /// `true` to read the entry as a package.
    fn accept(&self, entry: &WalkEntry) -> bool;
}

/// Accepts regular files whose name is longer than, and ends with, a suffix.
#[derive(Debug, Clone)]
pub struct PackageSuffixFilter {
    suffix: String,
}

impl PackageSuffixFilter {
    /// Filter on `suffix`.
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Default for PackageSuffixFilter {
    fn default() -> Self {
        Self::new(PACKAGE_SUFFIX)
    }
}

impl PathFilter for PackageSuffixFilter {
    fn accept(&self, entry: &WalkEntry) -> bool {
        if entry.visit != Visit::File {
            return false;
        }
        let Some(name) = entry.path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name.len() > self.suffix.len() && name.ends_with(&self.suffix)
    }
}

/// Depth-first walk over each root in turn.
pub struct FsWalk {
    roots: VecDeque<PathBuf>,
    options: WalkOptions,
    current: Option<walkdir::IntoIter>,
}

impl std::fmt::Debug for FsWalk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsWalk")
            .field("roots", &self.roots)
            .field("options", &self.options)
            .field("active", &self.current.is_some())
            .finish()
    }
}

impl FsWalk {
    /// Prepare a walk; nothing is read until [`FsWalk::next_entry`].
    pub fn open<I, P>(roots: I, options: WalkOptions) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            options,
            current: None,
        }
    }

    /// Next node of the walk, or `None` when every root is done.
    pub fn next_entry(&mut self) -> Option<WalkEntry> {
        loop {
            if self.current.is_none() {
                let root = self.roots.pop_front()?;
                tracing::debug!("Walking {}", root.display());
                let mut walker = WalkDir::new(root)
                    .follow_links(self.options.follow_links)
                    .same_file_system(self.options.same_file_system)
                    .sort_by_file_name();
                if let Some(depth) = self.options.max_depth {
                    walker = walker.max_depth(depth);
                }
                self.current = Some(walker.into_iter());
            }

            let next = self.current.as_mut().and_then(Iterator::next);
            let Some(result) = next else {
                self.current = None;
                continue;
            };

            let entry = match result {
                Ok(entry) => {
                    let ft = entry.file_type();
                    let visit = if ft.is_file() {
                        Visit::File
                    } else if ft.is_dir() {
                        Visit::Dir
                    } else if ft.is_symlink() {
                        Visit::Symlink
                    } else {
                        Visit::Other
                    };
                    WalkEntry {
                        path: entry.into_path(),
                        visit,
                    }
                }
                Err(e) => WalkEntry {
                    path: e.path().map(PathBuf::from).unwrap_or_default(),
                    visit: Visit::Error(e.to_string()),
                },
            };
            tracing::trace!("{:<7} {}", entry.visit.code(), entry.path.display());
            return Some(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn entry(path: &str, visit: Visit) -> WalkEntry {
        WalkEntry {
            path: PathBuf::from(path),
            visit,
        }
    }

    #[test]
    fn test_suffix_filter() {
        let filter = PackageSuffixFilter::default();
        assert!(filter.accept(&entry("/x/a.rpm", Visit::File)));
        assert!(!filter.accept(&entry("/x/.rpm", Visit::File)));
        assert!(!filter.accept(&entry("/x/a.rpm.txt", Visit::File)));
        assert!(!filter.accept(&entry("/x/d.rpm", Visit::Dir)));
        assert!(!filter.accept(&entry("/x/l.rpm", Visit::Symlink)));
        assert!(!filter.accept(&entry("/x/e.rpm", Visit::Error("loop".into()))));
    }

    #[test]
    fn test_walk_covers_every_root() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::create_dir(a.path().join("sub")).unwrap();
        fs::write(a.path().join("sub/one.rpm"), b"").unwrap();
        fs::write(b.path().join("two.rpm"), b"").unwrap();
        fs::write(b.path().join("notes.txt"), b"").unwrap();

        let filter = PackageSuffixFilter::default();
        let mut walk = FsWalk::open([a.path(), b.path()], WalkOptions::default());
        let mut found = Vec::new();
        while let Some(entry) = walk.next_entry() {
            if filter.accept(&entry) {
                found.push(entry.path.file_name().unwrap().to_string_lossy().into_owned());
            }
        }
        assert_eq!(found, vec!["one.rpm", "two.rpm"]);
    }

    #[test]
    fn test_max_depth() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("deep")).unwrap();
        fs::write(dir.path().join("deep/x.rpm"), b"").unwrap();

        let options = WalkOptions {
            max_depth: Some(1),
            ..WalkOptions::default()
        };
        let mut walk = FsWalk::open([dir.path()], options);
        let mut files = 0;
        while let Some(entry) = walk.next_entry() {
            if entry.visit == Visit::File {
                files += 1;
            }
        }
        assert_eq!(files, 0);
    }

    #[test]
    fn test_empty_roots() {
        let mut walk = FsWalk::open(Vec::<PathBuf>::new(), WalkOptions::default());
        assert!(walk.next_entry().is_none());
    }
}
