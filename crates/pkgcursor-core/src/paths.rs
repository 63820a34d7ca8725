use dirs::home_dir;
use std::path::PathBuf;

/// Environment variable overriding the state directory.
pub const HOME_ENV: &str = "PKGCURSOR_HOME";

/// Environment variable overriding the header archive path.
pub const HDLIST_ENV: &str = "PKGCURSOR_HDLIST";

/// Environment variable overriding the installed database path.
pub const DBPATH_ENV: &str = "PKGCURSOR_DBPATH";

/// Returns the state directory, or None if the user's home cannot be resolved.
pub fn try_pkgcursor_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var(HOME_ENV) {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".pkgcursor"))
}

/// Returns the state directory (`~/.pkgcursor`), relative to the working
/// directory when no home can be resolved.
pub fn pkgcursor_home() -> PathBuf {
    try_pkgcursor_home().unwrap_or_else(|| PathBuf::from(".pkgcursor"))
}

/// Config file: ~/.pkgcursor/config.toml
pub fn config_path() -> PathBuf {
    pkgcursor_home().join("config.toml")
}

/// Installed database (a header archive): ~/.pkgcursor/packages.hdlist
pub fn default_db_path() -> PathBuf {
    pkgcursor_home().join("packages.hdlist")
}

/// Built-in header archive location for the running architecture.
pub fn default_hdlist_path() -> PathBuf {
    PathBuf::from(format!(
        "/usr/share/comps/{}/hdlist",
        std::env::consts::ARCH
    ))
}

/// Expand a leading `~/` to the home directory.
pub fn expand_tilde(path: &str) -> String {
    match (path.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hdlist_names_arch() {
        let path = default_hdlist_path();
        assert!(path.starts_with("/usr/share/comps"));
        assert!(path.ends_with("hdlist"));
        assert!(path.to_string_lossy().contains(std::env::consts::ARCH));
    }

    #[test]
    fn test_expand_tilde_leaves_other_paths() {
        assert_eq!(expand_tilde("/tmp/x.rpm"), "/tmp/x.rpm");
        assert_eq!(expand_tilde("a~/b"), "a~/b");
    }
}
