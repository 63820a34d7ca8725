//! pkgcursor - iterate package headers
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]
//!
//! Command line front end for the generalized package iterator.
//!
//! # State Layout
//!
//! ```text
//! ~/.pkgcursor/
//! ├── config.toml       # CursorConfig
//! └── packages.hdlist   # installed database (header archive)
//! ```

pub mod cmd;

use clap::{Args, Parser, Subcommand};
use pkgcursor_core::{GiFlags, SourceKind};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pkgcursor")]
#[command(author, version, about = "pkgcursor - iterate package headers")]
pub struct Cli {
    /// Log at debug level and report dependency problems in detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Iterate headers from a source
    Query(QueryArgs),
    /// Write a package file from a TOML header description
    Pack {
        /// TOML header description
        desc: PathBuf,
        /// Package file to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write a header archive from package files and TOML descriptions
    Hdlist {
        /// Package files (`*.rpm`) or TOML header descriptions
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Archive to write
        #[arg(short, long)]
        output: PathBuf,
        /// Compress the archive with zstd
        #[arg(long)]
        compress: bool,
    },
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Source: arglist, packages, added, removed, hdlist, ftswalk, or a tag name
    #[arg(long, default_value = "arglist")]
    pub tag: SourceKind,
    /// Lookup key for a tag source without arguments
    #[arg(long)]
    pub key: Option<String>,
    /// Create a transaction and order it
    #[arg(short = 'T', long)]
    pub transaction: bool,
    /// Do not order the transaction
    #[arg(long)]
    pub noorder: bool,
    /// Do not glob arguments
    #[arg(long)]
    pub noglob: bool,
    /// Do not read non-package files as manifests
    #[arg(long)]
    pub nomanifest: bool,
    /// Do not read headers
    #[arg(long)]
    pub noheader: bool,
    /// Accumulate erasures instead of installs
    #[arg(long)]
    pub erase: bool,
    /// Format each header with this query format
    #[arg(long = "queryformat", visible_alias = "qf")]
    pub queryformat: Option<String>,
    /// Installed database (header archive)
    #[arg(long)]
    pub dbpath: Option<PathBuf>,
    /// Header archive for the hdlist source
    #[arg(long)]
    pub hdlist: Option<PathBuf>,
    /// Configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Do not follow symbolic links while walking
    #[arg(long)]
    pub nofollow: bool,
    /// Print one JSON object per step
    #[arg(long)]
    pub json: bool,
    /// Paths, patterns or keys, depending on the source
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl QueryArgs {
    /// Cursor flags selected on the command line.
    pub fn flags(&self) -> GiFlags {
        let mut flags = GiFlags::empty();
        if self.transaction {
            flags |= GiFlags::TRANSACTION;
        }
        if self.noorder {
            flags.remove(GiFlags::TS_ORDER);
        }
        flags.set(GiFlags::NO_GLOB, self.noglob);
        flags.set(GiFlags::NO_MANIFEST, self.nomanifest);
        flags.set(GiFlags::NO_HEADER, self.noheader);
        flags.set(GiFlags::ERASING, self.erase);
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(args: &[&str]) -> QueryArgs {
        let cli = Cli::parse_from(["pkgcursor", "query"].iter().chain(args));
        match cli.command {
            Commands::Query(q) => q,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_transaction_flags() {
        assert_eq!(query(&["-T"]).flags(), GiFlags::TRANSACTION);
        assert_eq!(query(&["-T", "--noorder"]).flags(), GiFlags::TS_ADD);
        assert_eq!(query(&["--noorder"]).flags(), GiFlags::empty());
        assert_eq!(
            query(&["--noglob", "--erase"]).flags(),
            GiFlags::NO_GLOB | GiFlags::ERASING
        );
    }

    #[test]
    fn test_source_and_args() {
        let q = query(&["--tag", "packages", "--qf", "%{name}", "name=ba.*"]);
        assert_eq!(q.tag, SourceKind::Packages);
        assert_eq!(q.queryformat.as_deref(), Some("%{name}"));
        assert_eq!(q.args, vec!["name=ba.*"]);

        let q = query(&["a.rpm", "-bash"]);
        assert_eq!(q.tag, SourceKind::ArgList);
        assert_eq!(q.args, vec!["a.rpm", "-bash"]);
    }
}
