//! Semantic version ordering and caret-range filtering
//!
//! Pure functions over version lists as published by a registry. Entries
//! that are not valid semantic versions are skipped, never reported.

use semver::{Version, VersionReq};
use tracing::debug;

/// Parse the valid semantic versions out of `versions`, keeping the original text.
fn parsed(versions: &[String]) -> impl Iterator<Item = (&String, Version)> {
    versions.iter().filter_map(|raw| match Version::parse(raw) {
        Ok(version) => Some((raw, version)),
        Err(_) => {
            debug!("Skipping non-semver version entry: {}", raw);
            None
        }
    })
}

/// Highest version by semantic-version precedence.
pub fn max_version(versions: &[String]) -> Option<String> {
    parsed(versions)
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(raw, _)| raw.clone())
}

/// Versions compatible with `^base`, newest first.
///
/// Returns an empty list when `base` is not a valid semantic version.
pub fn newer_versions(base: &str, versions: &[String]) -> Vec<String> {
    let req = match VersionReq::parse(&format!("^{}", base)) {
        Ok(req) => req,
        Err(e) => {
            debug!("Invalid base version {}: {}", base, e);
            return Vec::new();
        }
    };

    let mut matching: Vec<(&String, Version)> =
        parsed(versions).filter(|(_, v)| req.matches(v)).collect();
    matching.sort_by(|(_, a), (_, b)| b.cmp(a));
    matching.into_iter().map(|(raw, _)| raw.clone()).collect()
}

/// Highest version compatible with `^base`.
pub fn max_satisfying(base: &str, versions: &[String]) -> Option<String> {
    newer_versions(base, versions).into_iter().next()
}
