//! Cursor configuration loaded from `config.toml`.
//!
//! Every field has a default, so an absent file or an empty table is a valid
//! configuration. Environment variables override the file.

use std::path::{Path, PathBuf};

use pkgcursor_schema::PACKAGE_SUFFIX;
use serde::{Deserialize, Serialize};

use crate::error::{GiError, Result};
use crate::paths;

/// Default worklist sentinel prefixes.
pub const DEFAULT_SENTINELS: &str = "-+=";

/// Configuration shared by every cursor of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    /// Header archive read by the `hdlist` source.
    pub hdlist_path: Option<PathBuf>,
    /// Installed database (a header archive).
    pub db_path: Option<PathBuf>,
    /// File name suffix accepted by the filesystem walk.
    pub package_suffix: String,
    /// Worklist entries starting with one of these characters are
    /// passed through without being read.
    pub sentinels: String,
    /// Report dependency problems in detail and detect ordering loops.
    pub verbose: bool,
    /// Filesystem walk options.
    pub walk: WalkOptions,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            hdlist_path: None,
            db_path: None,
            package_suffix: PACKAGE_SUFFIX.to_string(),
            sentinels: DEFAULT_SENTINELS.to_string(),
            verbose: false,
            walk: WalkOptions::default(),
        }
    }
}

/// The `[walk]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkOptions {
    /// Follow symbolic links (a logical walk).
    pub follow_links: bool,
    /// Maximum descent below each root.
    pub max_depth: Option<usize>,
    /// Do not cross file system boundaries.
    pub same_file_system: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            follow_links: true,
            max_depth: None,
            same_file_system: false,
        }
    }
}

impl CursorConfig {
    /// Parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`GiError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GiError::config(format!("{}: {e}", path.display())))?;
        Self::parse(&content).map_err(|e| GiError::config(format!("{}: {e}", path.display())))
    }

    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`GiError::Config`] on invalid TOML or unknown value types.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(GiError::config)
    }

    /// Read `$PKGCURSOR_HOME/config.toml` when present, then apply
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`GiError::Config`] if the file exists but is invalid.
    pub fn discover() -> Result<Self> {
        let path = paths::config_path();
        let mut config = if path.is_file() {
            tracing::debug!("Loading config from {}", path.display());
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply `PKGCURSOR_HDLIST` and `PKGCURSOR_DBPATH` as looked up by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(paths::HDLIST_ENV).filter(|v| !v.is_empty()) {
            self.hdlist_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(paths::DBPATH_ENV).filter(|v| !v.is_empty()) {
            self.db_path = Some(PathBuf::from(v));
        }
    }

    /// Header archive path, falling back to the built-in default.
    pub fn resolved_hdlist_path(&self) -> PathBuf {
        self.hdlist_path
            .clone()
            .unwrap_or_else(paths::default_hdlist_path)
    }

    /// Installed database path, falling back to the state directory.
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(paths::default_db_path)
    }
}
