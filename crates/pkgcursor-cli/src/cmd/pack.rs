//! Pack command

use std::path::Path;

use anyhow::{Context, Result};
use pkgcursor_schema::{Header, write_package_file};

/// Parse a TOML header description.
pub fn load_desc(path: &Path) -> Result<Header> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut header: Header = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    if header.arch.is_empty() {
        header.arch = "noarch".to_string();
    }
    Ok(header)
}

/// Write a package file from a header description.
pub fn pack(desc: &Path, output: &Path) -> Result<()> {
    let header = load_desc(desc)?;
    write_package_file(output, &header)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!("Wrote {} to {}", header.nevra(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgcursor_schema::read_package_file;

    #[test]
    fn test_pack_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let desc = dir.path().join("bash.toml");
        std::fs::write(
            &desc,
            r#"
name = "bash"
version = "5.2"
release = "1"
requires = ["glibc"]
"#,
        )
        .unwrap();
        let out = dir.path().join("bash.rpm");

        pack(&desc, &out).unwrap();
        let header = read_package_file(&out).unwrap();
        assert_eq!(header.nevra(), "bash-5.2-1.noarch");
        assert_eq!(header.requires, vec!["glibc"]);
    }

    #[test]
    fn test_bad_desc() {
        let dir = tempfile::tempdir().unwrap();
        let desc = dir.path().join("bad.toml");
        std::fs::write(&desc, "name = 1").unwrap();
        assert!(load_desc(&desc).is_err());
    }
}
