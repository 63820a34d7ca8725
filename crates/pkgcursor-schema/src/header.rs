//! Package header model.
//!
//! A [`Header`] is the metadata record of one package. Headers are shared by
//! reference ([`HeaderRef`]) between the database, transaction elements and
//! cursors; cloning a `HeaderRef` takes another reference, dropping it
//! releases one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Tag;

/// Shared reference to an immutable header.
pub type HeaderRef = Arc<Header>;

/// Errors raised while expanding a query format.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// A `%{...}` reference names an unknown tag.
    #[error("unknown tag in query format: \"{0}\"")]
    UnknownTag(String),

    /// A `%{` was never closed.
    #[error("unterminated tag reference at byte {0}")]
    Unterminated(usize),
}

/// Metadata record describing one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Package name.
    pub name: String,
    /// Optional epoch (omitted from the NEVRA when absent).
    #[serde(default)]
    pub epoch: Option<u32>,
    /// Upstream version.
    pub version: String,
    /// Distribution release.
    pub release: String,
    /// Target architecture (e.g. `x86_64`, `noarch`).
    #[serde(default)]
    pub arch: String,
    /// One-line summary.
    #[serde(default)]
    pub summary: String,
    /// Capabilities provided in addition to the package name.
    #[serde(default)]
    pub provides: Vec<String>,
    /// Capabilities required at install time.
    #[serde(default)]
    pub requires: Vec<String>,
    /// File basenames shipped by the package.
    #[serde(default)]
    pub basenames: Vec<String>,
    /// Source package this binary package was built from.
    #[serde(default)]
    pub source_rpm: Option<String>,
    /// Database record offset; 0 when the header did not come from a database.
    #[serde(skip)]
    pub instance: u32,
}

impl Header {
    /// Create a header with the identifying fields set.
    pub fn new(name: &str, version: &str, release: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            release: release.to_string(),
            arch: "noarch".to_string(),
            ..Self::default()
        }
    }

    /// Set the architecture.
    pub fn with_arch(mut self, arch: &str) -> Self {
        self.arch = arch.to_string();
        self
    }

    /// Add provided capabilities.
    pub fn with_provides<I, S>(mut self, provides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides.extend(provides.into_iter().map(Into::into));
        self
    }

    /// Add required capabilities.
    pub fn with_requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(requires.into_iter().map(Into::into));
        self
    }

    /// Set the database instance.
    pub fn with_instance(mut self, instance: u32) -> Self {
        self.instance = instance;
        self
    }

    /// Wrap in a shared reference.
    pub fn into_ref(self) -> HeaderRef {
        Arc::new(self)
    }

    /// `name-[epoch:]version-release.arch`
    pub fn nevra(&self) -> String {
        let evr = match self.epoch {
            Some(e) => format!("{e}:{}-{}", self.version, self.release),
            None => format!("{}-{}", self.version, self.release),
        };
        if self.arch.is_empty() {
            format!("{}-{evr}", self.name)
        } else {
            format!("{}-{evr}.{}", self.name, self.arch)
        }
    }

    /// Whether this header satisfies `capability`, by name or by provides.
    pub fn provides_capability(&self, capability: &str) -> bool {
        self.name == capability || self.provides.iter().any(|p| p == capability)
    }

    /// All values of `tag`, in header order. Scalar tags yield at most one value.
    pub fn values(&self, tag: Tag) -> Vec<String> {
        match tag {
            Tag::Name => vec![self.name.clone()],
            Tag::Epoch => self.epoch.map(|e| e.to_string()).into_iter().collect(),
            Tag::Version => vec![self.version.clone()],
            Tag::Release => vec![self.release.clone()],
            Tag::Arch => vec![self.arch.clone()],
            Tag::Summary => vec![self.summary.clone()],
            Tag::ProvideName => std::iter::once(self.name.clone())
                .chain(self.provides.iter().cloned())
                .collect(),
            Tag::RequireName => self.requires.clone(),
            Tag::Basenames => self.basenames.clone(),
            Tag::SourceRpm => self.source_rpm.clone().into_iter().collect(),
        }
    }

    /// Expand a query format such as `%{name}-%{version}\n`.
    ///
    /// `%%` is a literal percent; `\n` and `\t` are recognised escapes; a tag
    /// with no value expands to `(none)`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when a reference is unterminated or names an
    /// unknown tag.
    pub fn format(&self, qf: &str) -> Result<String, FormatError> {
        let mut out = String::with_capacity(qf.len());
        let mut chars = qf.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '%' => match chars.peek() {
                    Some((_, '%')) => {
                        chars.next();
                        out.push('%');
                    }
                    Some((_, '{')) => {
                        chars.next();
                        let mut name = String::new();
                        let mut closed = false;
                        for (_, c) in chars.by_ref() {
                            if c == '}' {
                                closed = true;
                                break;
                            }
                            name.push(c);
                        }
                        if !closed {
                            return Err(FormatError::Unterminated(pos));
                        }
                        let tag = Tag::from_name(&name).ok_or(FormatError::UnknownTag(name))?;
                        match self.values(tag).into_iter().next() {
                            Some(v) => out.push_str(&v),
                            None => out.push_str("(none)"),
                        }
                    }
                    _ => out.push('%'),
                },
                '\\' => match chars.peek() {
                    Some((_, 'n')) => {
                        chars.next();
                        out.push('\n');
                    }
                    Some((_, 't')) => {
                        chars.next();
                        out.push('\t');
                    }
                    _ => out.push('\\'),
                },
                c => out.push(c),
            }
        }

        Ok(out)
    }
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.nevra())
    }
}
