//! # stencil-package
//!
//! Package resolution and caching for the stencil CLI:
//! - Registry lookups with semantic-version ordering and caret ranges
//! - Deterministic, version-keyed cache layout
//! - Package handles that decide between install and update
//! - Entry point discovery through the package manifest

pub mod error;
pub mod handle;
pub mod installer;
pub mod layout;
pub mod manifest;
pub mod registry;
pub mod versions;

pub use error::{PackageError, Result};
pub use handle::{PackageHandle, PackageRequest, RequestedVersion, ResolutionState, UpdateOutcome};
pub use installer::{InstallRequest, Installer, PackageSpec, RegistryInstaller};
pub use layout::{cache_key, cache_path, CacheLayout};
pub use registry::{PackageInfo, RegistryClient, VersionSource};
