//! Package manifest discovery and entry point resolution

use crate::error::{PackageError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use stencil_core::normalize_path;
use tracing::debug;

/// Manifest file name
pub const MANIFEST_FILE: &str = "package.json";

/// The subset of `package.json` this crate reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Relative path of the primary entry file
    pub main: Option<String>,
}

/// Nearest directory at or above `start` containing a manifest
pub fn find_package_root(start: &Path) -> Option<PathBuf> {
    let start = normalize_path(start);
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Read and parse the manifest in `dir`
pub fn read_manifest(dir: &Path) -> Result<PackageManifest> {
    let path = dir.join(MANIFEST_FILE);
    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content).map_err(|source| PackageError::Manifest { path, source })
}

/// Absolute path of the entry file declared by the package around `search_dir`
///
/// Returns `Ok(None)` when no manifest is found or the manifest has no `main`.
pub fn entry_point(search_dir: &Path) -> Result<Option<PathBuf>> {
    let Some(root) = find_package_root(search_dir) else {
        debug!("No {} found at or above {}", MANIFEST_FILE, search_dir.display());
        return Ok(None);
    };

    let manifest = read_manifest(&root)?;
    match manifest.main.as_deref().map(str::trim) {
        Some(main) if !main.is_empty() => Ok(Some(normalize_path(&root.join(main)))),
        _ => {
            debug!("{} in {} declares no main entry", MANIFEST_FILE, root.display());
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, body: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), body).unwrap();
    }

    #[test]
    fn test_entry_point_from_main() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), r#"{"name":"demo","main":"lib/index.js"}"#);

        let entry = entry_point(temp.path()).unwrap().unwrap();
        assert!(entry.is_absolute());
        assert!(entry.ends_with("lib/index.js"));
    }

    #[test]
    fn test_entry_point_found_from_nested_dir() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), r#"{"main":"./bin/../lib/cli.js"}"#);
        let nested = temp.path().join("lib").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let entry = entry_point(&nested).unwrap().unwrap();
        assert_eq!(entry, normalize_path(&temp.path().join("lib/cli.js")));
    }

    #[test]
    fn test_entry_point_without_main() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), r#"{"name":"demo"}"#);
        assert!(entry_point(temp.path()).unwrap().is_none());

        write_manifest(temp.path(), r#"{"name":"demo","main":"  "}"#);
        assert!(entry_point(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_malformed_manifest_is_an_error() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "{ not json");
        let err = entry_point(temp.path()).unwrap_err();
        assert!(matches!(err, PackageError::Manifest { .. }));
    }

    #[test]
    fn test_read_manifest_fields() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            r#"{"name":"@acme/init","version":"1.2.3","main":"index.js","bin":{}}"#,
        );
        let manifest = read_manifest(temp.path()).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("@acme/init"));
        assert_eq!(manifest.version.as_deref(), Some("1.2.3"));
        assert_eq!(manifest.main.as_deref(), Some("index.js"));
    }
}
