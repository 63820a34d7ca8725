use std::str::FromStr;

use pkgcursor_schema::Tag;

use crate::db::DbIndex;

/// Where a [`Cursor`](crate::Cursor) draws its headers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Database lookups on one index, one per argument (or the construction key).
    Keyed(DbIndex),
    /// One full-database scan filtered by `TAG=pattern` arguments.
    Packages,
    /// Install elements of the transaction.
    Added,
    /// Erase elements of the transaction.
    Removed,
    /// Records of a header archive.
    HeaderList,
    /// Package files and manifests named by the arguments.
    ArgList,
    /// Package files found below the argument directories.
    FtsWalk,
}

impl SourceKind {
    /// Whether arguments for this source are glob-expanded.
    pub fn expands_globs(self) -> bool {
        matches!(self, Self::HeaderList | Self::ArgList | Self::FtsWalk)
    }

    /// Whether this source replays transaction elements.
    pub fn is_transaction(self) -> bool {
        matches!(self, Self::Added | Self::Removed)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyed(index) => write!(f, "{index}"),
            Self::Packages => write!(f, "packages"),
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
            Self::HeaderList => write!(f, "hdlist"),
            Self::ArgList => write!(f, "arglist"),
            Self::FtsWalk => write!(f, "ftswalk"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "packages" => Self::Packages,
            "added" => Self::Added,
            "removed" => Self::Removed,
            "hdlist" => Self::HeaderList,
            "arglist" => Self::ArgList,
            "ftswalk" => Self::FtsWalk,
            "depends" => Self::Keyed(DbIndex::Depends),
            other => match Tag::from_name(other) {
                Some(tag) => Self::Keyed(DbIndex::Tag(tag)),
                None => return Err(format!("unknown source: {s}")),
            },
        })
    }
}
