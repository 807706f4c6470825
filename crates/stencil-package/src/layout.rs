//! Deterministic on-disk cache layout
//!
//! Every cached package version lives in its own directory under the store:
//!
//! ```text
//! {store_dir}/_{sanitized_name}@{version}@{name}/
//! ```
//!
//! where `sanitized_name` replaces the scope separator `/` with `_`. For a
//! scoped name such as `@acme/init` the trailing `{name}` segment nests one
//! level deeper (`_@acme_init@1.0.0@@acme/init`), matching the layout other
//! npm-compatible stores produce.

use std::path::{Path, PathBuf};
use stencil_core::normalize_path;

/// Directory key for a (name, version) pair
pub fn cache_key(name: &str, version: &str) -> String {
    format!("_{}@{}@{}", name.replace('/', "_"), version, name)
}

/// Cache path for a package version under `store_dir`
///
/// Identical inputs always produce the identical path; the filesystem is not
/// consulted.
pub fn cache_path(store_dir: &Path, name: &str, version: &str) -> PathBuf {
    CacheLayout::new(store_dir).cache_path(name, version)
}

/// Store directory with its absolute location fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    store_dir: PathBuf,
}

impl CacheLayout {
    /// Create a layout rooted at `store_dir`
    ///
    /// A relative store directory is resolved against the current directory
    /// once, here.
    pub fn new(store_dir: impl AsRef<Path>) -> Self {
        Self {
            store_dir: normalize_path(store_dir.as_ref()),
        }
    }

    /// Absolute store directory
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Absolute cache path for `name` at `version`
    pub fn cache_path(&self, name: &str, version: &str) -> PathBuf {
        self.store_dir.join(cache_key(name, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_plain_name() {
        assert_eq!(cache_key("left-pad", "1.3.0"), "_left-pad@1.3.0@left-pad");
    }

    #[test]
    fn test_cache_key_scoped_name() {
        assert_eq!(
            cache_key("@acme/init", "2.0.1"),
            "_@acme_init@2.0.1@@acme/init"
        );
    }

    #[test]
    fn test_cache_path_is_deterministic() {
        let store = Path::new("/var/cache/stencil/node_modules");
        let first = cache_path(store, "@acme/init", "1.0.0");
        let second = cache_path(store, "@acme/init", "1.0.0");
        assert_eq!(first, second);
        assert!(first.is_absolute());
    }

    #[test]
    fn test_distinct_versions_get_distinct_paths() {
        let layout = CacheLayout::new("/var/cache/stencil/node_modules");
        let versions = ["1.0.0", "1.0.1", "1.0.0-beta.1", "10.0.0"];
        let paths: std::collections::HashSet<PathBuf> = versions
            .iter()
            .map(|v| layout.cache_path("@acme/init", v))
            .collect();
        assert_eq!(paths.len(), versions.len());
    }

    #[test]
    fn test_scope_does_not_collide_with_underscore_name() {
        let layout = CacheLayout::new("/store");
        assert_ne!(
            layout.cache_path("a/b", "1.0.0"),
            layout.cache_path("a_b", "1.0.0")
        );
    }

    #[test]
    fn test_relative_store_dir_becomes_absolute() {
        let layout = CacheLayout::new("relative/store");
        assert!(layout.store_dir().is_absolute());
        assert!(layout
            .cache_path("pkg", "1.0.0")
            .starts_with(layout.store_dir()));
    }
}
