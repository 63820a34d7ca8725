//! Argument preprocessing: whitespace escaping and glob expansion.

use crate::flags::GiFlags;
use crate::paths::expand_tilde;
use crate::source::SourceKind;

/// Expands a (whitespace-escaped) glob pattern into matching paths.
pub trait GlobExpander: std::fmt::Debug {
    /// Every match of `pattern`, in a stable order. No match is an empty list.
    fn expand(&self, pattern: &str) -> Vec<String>;
}

/// Filesystem globbing through the `glob` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsGlob;

impl GlobExpander for FsGlob {
    fn expand(&self, pattern: &str) -> Vec<String> {
        let pattern = expand_tilde(&unescape_spaces(pattern));
        if !has_glob_meta(&pattern) {
            return vec![pattern];
        }

        match glob::glob(&pattern) {
            Ok(paths) => paths
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path.to_string_lossy().into_owned()),
                    Err(e) => {
                        tracing::warn!("glob {pattern}: {e}");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                tracing::warn!("invalid glob {pattern}: {e}");
                vec![pattern]
            }
        }
    }
}

fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Prefix every whitespace character with a backslash.
pub fn escape_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_whitespace() {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Inverse of [`escape_spaces`].
pub fn unescape_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek().is_some_and(|n| n.is_whitespace()) {
            continue;
        }
        out.push(c);
    }
    out
}

/// Build the worklist for `kind` from raw arguments.
///
/// Arguments are copied verbatim when `NO_GLOB` is set or the source does
/// not take paths; otherwise each is escaped and every glob match appended.
pub fn preprocess<S: AsRef<str>>(
    args: &[S],
    kind: SourceKind,
    flags: GiFlags,
    expander: &dyn GlobExpander,
) -> Vec<String> {
    if flags.contains(GiFlags::NO_GLOB) || !kind.expands_globs() {
        return args.iter().map(|a| a.as_ref().to_string()).collect();
    }

    let mut out = Vec::new();
    for arg in args {
        let matches = expander.expand(&escape_spaces(arg.as_ref()));
        if matches.is_empty() {
            tracing::debug!("glob {} matched nothing", arg.as_ref());
        }
        out.extend(matches);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[derive(Debug)]
    struct Doubling;

    impl GlobExpander for Doubling {
        fn expand(&self, pattern: &str) -> Vec<String> {
            vec![format!("{pattern}.1"), format!("{pattern}.2")]
        }
    }

    #[test]
    fn test_escape_spaces() {
        assert_eq!(escape_spaces("my file.rpm"), "my\\ file.rpm");
        assert_eq!(escape_spaces("a\tb"), "a\\\tb");
        assert_eq!(unescape_spaces(&escape_spaces("x y z")), "x y z");
    }

    #[test]
    fn test_noglob_copies_verbatim() {
        let out = preprocess(&["a b*", "c"], SourceKind::ArgList, GiFlags::NO_GLOB, &Doubling);
        assert_eq!(out, vec!["a b*", "c"]);
    }

    #[test]
    fn test_non_path_sources_are_verbatim() {
        let out = preprocess(&["name=ba*"], SourceKind::Packages, GiFlags::empty(), &Doubling);
        assert_eq!(out, vec!["name=ba*"]);
    }

    #[test]
    fn test_matches_are_appended_in_order() {
        let out = preprocess(&["a", "b c"], SourceKind::ArgList, GiFlags::empty(), &Doubling);
        assert_eq!(out, vec!["a.1", "a.2", "b\\ c.1", "b\\ c.2"]);
    }

    #[test]
    fn test_fs_glob() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.rpm", "a.rpm", "with space.rpm", "c.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let root = dir.path().to_string_lossy().into_owned();

        let out = preprocess(
            &[format!("{root}/*.rpm")],
            SourceKind::ArgList,
            GiFlags::empty(),
            &FsGlob,
        );
        assert_eq!(
            out,
            vec![
                format!("{root}/a.rpm"),
                format!("{root}/b.rpm"),
                format!("{root}/with space.rpm"),
            ]
        );

        let none = preprocess(
            &[format!("{root}/*.deb")],
            SourceKind::ArgList,
            GiFlags::empty(),
            &FsGlob,
        );
        assert!(none.is_empty());
    }

    #[test]
    fn test_fs_glob_literal_passthrough() {
        assert_eq!(FsGlob.expand("/no/such/file\\ x.rpm"), vec!["/no/such/file x.rpm"]);
    }
}
