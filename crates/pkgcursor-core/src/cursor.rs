//! The generalized package cursor.
//!
//! A [`Cursor`] enumerates headers from one of several sources behind a
//! single [`Cursor::next`] call. Each source opens its backend lazily on the
//! first step and releases it when exhausted. With [`GiFlags::TS_ADD`] every
//! produced header is registered with the transaction; with
//! [`GiFlags::TS_ORDER`] the transaction is checked and ordered once the
//! source runs dry, and the cursor then replays the ordered elements.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pkgcursor_schema::{HeaderArchive, HeaderRef, Tag, read_package_file};

use crate::args::{FsGlob, GlobExpander, preprocess};
use crate::config::CursorConfig;
use crate::db::{DbIndex, MatchIterator};
use crate::error::{GiError, Result};
use crate::finalize::finalize;
use crate::flags::GiFlags;
use crate::manifest::{FileManifestReader, ManifestError, ManifestReader};
use crate::source::SourceKind;
use crate::ts::{Element, ElementKind, Transaction};
use crate::walk::{FsWalk, PackageSuffixFilter, PathFilter, Visit};
use crate::worklist::Worklist;

/// Outcome of a successful [`Cursor::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A step was produced.
    Ok,
    /// The source is exhausted (or was just finalized).
    NotFound,
}

/// The one open backend handle of a cursor.
#[derive(Debug, Default)]
enum Backend {
    #[default]
    Idle,
    Keyed(Box<dyn MatchIterator>),
    Packages(Box<dyn MatchIterator>),
    Elements(std::vec::IntoIter<Element>),
    Archive(HeaderArchive),
    Walk(FsWalk),
}

/// What one backend step produced.
#[derive(Debug)]
struct Step {
    header: Option<HeaderRef>,
    provenance: String,
}

impl Step {
    fn header(header: HeaderRef, provenance: String) -> Self {
        Self {
            header: Some(header),
            provenance,
        }
    }

    fn bare(provenance: String) -> Self {
        Self {
            header: None,
            provenance,
        }
    }
}

/// Generalized package iterator.
#[derive(Debug)]
pub struct Cursor {
    ts: Transaction,
    kind: SourceKind,
    key: Option<Vec<u8>>,
    args: Worklist,
    flags: GiFlags,
    config: CursorConfig,

    index: Option<usize>,
    active: bool,
    exhausted: bool,
    next_key: usize,
    expanded: HashSet<PathBuf>,
    backend: Backend,

    header: Option<HeaderRef>,
    provenance: String,

    glob: Box<dyn GlobExpander>,
    manifest: Box<dyn ManifestReader>,
    filter: Box<dyn PathFilter>,
}

impl Cursor {
    /// Create a cursor over `kind` with the default configuration.
    ///
    /// `key` is the lookup key of a keyed source when no arguments are set.
    pub fn new(ts: &Transaction, kind: SourceKind, key: Option<&[u8]>) -> Self {
        Self::with_config(ts, kind, key, CursorConfig::default())
    }

    /// Create a cursor using `config`.
    pub fn with_config(
        ts: &Transaction,
        kind: SourceKind,
        key: Option<&[u8]>,
        config: CursorConfig,
    ) -> Self {
        let filter = PackageSuffixFilter::new(config.package_suffix.clone());
        Self {
            ts: ts.clone(),
            kind,
            key: key.map(<[u8]>::to_vec),
            args: Worklist::default(),
            flags: GiFlags::empty(),
            config,
            index: None,
            active: false,
            exhausted: false,
            next_key: 0,
            expanded: HashSet::new(),
            backend: Backend::Idle,
            header: None,
            provenance: String::new(),
            glob: Box::new(FsGlob),
            manifest: Box::new(FileManifestReader::new(FsGlob)),
            filter: Box::new(filter),
        }
    }

    /// Replace the glob expander used by [`Cursor::set_args`].
    pub fn set_glob(&mut self, glob: Box<dyn GlobExpander>) {
        self.glob = glob;
    }

    /// Replace the manifest reader.
    pub fn set_manifest_reader(&mut self, reader: Box<dyn ManifestReader>) {
        self.manifest = reader;
    }

    /// Replace the filesystem walk filter.
    pub fn set_filter(&mut self, filter: Box<dyn PathFilter>) {
        self.filter = filter;
    }

    /// Set flags and the argument list, glob-expanding it for path sources.
    pub fn set_args<S: AsRef<str>>(&mut self, args: &[S], flags: GiFlags) {
        self.flags = flags;
        self.args = Worklist::new(preprocess(args, self.kind, flags, self.glob.as_ref()));
        tracing::debug!("{} arguments for {} source", self.args.len(), self.kind);
    }

    /// Advance to the next step.
    ///
    /// Returns [`Status::NotFound`] when the source is exhausted; once a
    /// transaction has been ordered, this is returned once before the
    /// ordered replay begins.
    ///
    /// # Errors
    ///
    /// Any hard failure of the backend. The cursor is exhausted afterwards.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Status> {
        self.header = None;
        self.provenance.clear();

        if self.exhausted {
            return Ok(Status::NotFound);
        }

        let step = match self.step() {
            Ok(step) => step,
            Err(e) => {
                self.close();
                self.exhausted = true;
                return Err(e);
            }
        };

        let Some(step) = step else {
            self.close();
            if self.flags.contains(GiFlags::TS_ORDER) {
                return self.finish_transaction();
            }
            self.exhausted = true;
            return Ok(Status::NotFound);
        };

        let header = if self.flags.contains(GiFlags::NO_HEADER) {
            None
        } else {
            step.header
        };
        if self.flags.contains(GiFlags::TS_ADD) {
            if let Some(header) = &header {
                self.register(header, &step.provenance);
            }
        }
        self.header = header;
        self.provenance = step.provenance;
        Ok(Status::Ok)
    }

    fn register(&self, header: &HeaderRef, provenance: &str) {
        if self.flags.contains(GiFlags::ERASING) {
            let instance = if header.instance > 0 {
                i64::from(header.instance)
            } else {
                self.ts.next_erase_placeholder()
            };
            self.ts.add_erase_element(HeaderRef::clone(header), instance);
        } else {
            self.ts
                .add_install_element(HeaderRef::clone(header), provenance);
        }
    }

    fn finish_transaction(&mut self) -> Result<Status> {
        match finalize(&self.ts, self.flags, self.config.verbose) {
            Ok(kind) => {
                self.kind = kind;
                self.flags.remove(GiFlags::TRANSACTION);
                Ok(Status::NotFound)
            }
            Err(e) => {
                self.exhausted = true;
                Err(e)
            }
        }
    }

    /// Release the backend and return to idle.
    fn close(&mut self) {
        self.backend = Backend::Idle;
        self.header = None;
        self.index = None;
        self.active = false;
        self.next_key = 0;
        self.expanded.clear();
    }

    fn step(&mut self) -> Result<Option<Step>> {
        let ordinal = self.index.map_or(0, |i| i + 1);
        let step = match self.kind {
            SourceKind::Keyed(index) => self.next_keyed(index)?,
            SourceKind::Packages => self.next_filtered()?,
            SourceKind::Added => self.next_element(ElementKind::Added, ordinal),
            SourceKind::Removed => self.next_element(ElementKind::Removed, ordinal),
            SourceKind::HeaderList => self.next_archived(ordinal)?,
            SourceKind::ArgList => self.next_path(ordinal)?,
            SourceKind::FtsWalk => self.next_walked(),
        };
        if step.is_some() {
            self.index = Some(ordinal);
        }
        Ok(step)
    }

    fn next_keyed(&mut self, index: DbIndex) -> Result<Option<Step>> {
        loop {
            if let Backend::Keyed(it) = &mut self.backend {
                if let Some(header) = it.next_header() {
                    let provenance = format!("rpmdb h# {}", it.offset());
                    return Ok(Some(Step::header(header, provenance)));
                }
            }
            self.backend = Backend::Idle;

            let key = if self.args.is_empty() {
                if self.next_key > 0 {
                    return Ok(None);
                }
                self.key.clone()
            } else {
                match self.args.get(self.next_key) {
                    Some(arg) => Some(arg.as_bytes().to_vec()),
                    None => return Ok(None),
                }
            };
            self.next_key += 1;

            match self.ts.db().open_iterator(index, key.as_deref()) {
                Some(it) => {
                    self.backend = Backend::Keyed(it);
                    self.active = true;
                }
                None => tracing::debug!(
                    "No {index} match for {}",
                    key.as_deref().map(String::from_utf8_lossy).unwrap_or_default()
                ),
            }
        }
    }

    fn next_filtered(&mut self) -> Result<Option<Step>> {
        if !self.active {
            self.active = true;
            let Some(mut it) = self.ts.db().open_iterator(DbIndex::Packages, None) else {
                return Ok(None);
            };
            for arg in self.args.as_slice() {
                let (tag, pattern) = parse_filter(arg)?;
                it.set_regex(tag, pattern)?;
            }
            self.backend = Backend::Packages(it);
        }

        let Backend::Packages(it) = &mut self.backend else {
            return Ok(None);
        };
        Ok(it.next_header().map(|header| {
            let provenance = format!("rpmdb h# {}", it.offset());
            Step::header(header, provenance)
        }))
    }

    fn next_element(&mut self, kind: ElementKind, ordinal: usize) -> Option<Step> {
        if !self.active {
            self.active = true;
            self.backend = Backend::Elements(self.ts.elements(Some(kind)).into_iter());
        }

        let Backend::Elements(elements) = &mut self.backend else {
            return None;
        };
        let element = elements.next()?;
        let prefix = match element.kind {
            ElementKind::Added => "+++",
            ElementKind::Removed => "---",
        };
        Some(Step::header(element.header, format!("{prefix} h# {ordinal}")))
    }

    fn next_archived(&mut self, ordinal: usize) -> Result<Option<Step>> {
        if !self.active {
            self.active = true;
            let path = self.config.resolved_hdlist_path();
            let archive = HeaderArchive::open(&path)
                .map_err(|source| GiError::Archive { path, source })?;
            tracing::debug!(
                "Opened header archive {} (compressed: {})",
                archive.path().display(),
                archive.is_compressed()
            );
            self.backend = Backend::Archive(archive);
        }

        let Backend::Archive(archive) = &mut self.backend else {
            return Ok(None);
        };
        match archive.next_header() {
            Ok(Some(header)) => Ok(Some(Step::header(
                header.into_ref(),
                format!("hdlist h# {ordinal}"),
            ))),
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::error!("{}: read failed: {e}", archive.path().display());
                Ok(None)
            }
        }
    }

    fn is_sentinel(&self, entry: &str) -> bool {
        entry
            .chars()
            .next()
            .is_some_and(|c| self.config.sentinels.contains(c))
    }

    fn next_path(&mut self, pos: usize) -> Result<Option<Step>> {
        self.active = true;
        loop {
            let Some(entry) = self.args.get(pos).map(str::to_string) else {
                return Ok(None);
            };

            if self.is_sentinel(&entry) || self.flags.contains(GiFlags::NO_HEADER) {
                return Ok(Some(Step::bare(entry)));
            }

            let err = match read_package_file(Path::new(&entry)) {
                Ok(header) => return Ok(Some(Step::header(header.into_ref(), entry))),
                Err(err) => err,
            };
            if self.flags.contains(GiFlags::NO_MANIFEST) || !err.may_be_manifest() {
                return Err(GiError::package(entry, err));
            }

            tracing::debug!("{entry}: {err}, reading as manifest");
            let Some(taken) = self.args.take(pos) else {
                return Ok(None);
            };
            let canonical =
                std::fs::canonicalize(&taken).unwrap_or_else(|_| PathBuf::from(&taken));
            if !self.expanded.insert(canonical) {
                let path = PathBuf::from(&taken);
                self.args.restore(pos, taken);
                return Err(GiError::Manifest {
                    path,
                    source: ManifestError::Cycle,
                });
            }
            match self.manifest.parse(Path::new(&taken)) {
                Ok(entries) => {
                    tracing::debug!("Splicing {} manifest entries from {taken}", entries.len());
                    self.args.splice(pos, entries);
                }
                Err(source) => {
                    let path = PathBuf::from(&taken);
                    self.args.restore(pos, taken);
                    return Err(GiError::Manifest { path, source });
                }
            }
        }
    }

    fn next_walked(&mut self) -> Option<Step> {
        if self.args.is_empty() {
            return None;
        }
        if !self.active {
            self.active = true;
            let roots: Vec<PathBuf> = self.args.as_slice().iter().map(PathBuf::from).collect();
            self.backend = Backend::Walk(FsWalk::open(roots, self.config.walk.clone()));
        }

        let Backend::Walk(walk) = &mut self.backend else {
            return None;
        };
        while let Some(entry) = walk.next_entry() {
            if let Visit::Error(msg) = &entry.visit {
                tracing::warn!("{}: {msg}", entry.path.display());
                continue;
            }
            if !self.filter.accept(&entry) {
                continue;
            }

            let provenance = entry.path.to_string_lossy().into_owned();
            if self.flags.contains(GiFlags::NO_HEADER) {
                return Some(Step::bare(provenance));
            }
            return Some(match read_package_file(&entry.path) {
                Ok(header) => Step::header(header.into_ref(), provenance),
                Err(e) => {
                    tracing::warn!("{provenance}: {e}");
                    Step::bare(provenance)
                }
            });
        }
        None
    }

    /// Header of the current step, if one was materialized.
    pub fn header(&self) -> Option<&HeaderRef> {
        self.header.as_ref()
    }

    /// Where the current step came from.
    pub fn provenance(&self) -> &str {
        &self.provenance
    }

    /// Position of the current step; `None` when idle or exhausted.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Current source kind (rewritten by finalization).
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Current flags.
    pub fn flags(&self) -> GiFlags {
        self.flags
    }

    /// Current worklist.
    pub fn args(&self) -> &[String] {
        self.args.as_slice()
    }

    /// Whether a backend is open for the current run.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The transaction this cursor feeds.
    pub fn transaction(&self) -> &Transaction {
        &self.ts
    }
}

/// Split a `TAG=pattern` filter; a bare pattern or `=pattern` filters names.
fn parse_filter(arg: &str) -> Result<(Tag, &str)> {
    match arg.split_once('=') {
        None => Ok((Tag::Name, arg)),
        Some(("", pattern)) => Ok((Tag::Name, pattern)),
        Some((name, pattern)) => Tag::from_name(name)
            .map(|tag| (tag, pattern))
            .ok_or_else(|| GiError::UnknownTag(name.to_string())),
    }
}
