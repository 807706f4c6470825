//! Package handle: resolve, probe, install, and update one package
//!
//! A handle moves through two resolution states:
//!
//! ```text
//! Unresolved --resolve()--> Resolved(version)
//! ```
//!
//! [`PackageHandle::resolve`] is explicit and idempotent; `exists`,
//! `install`, and `update` call it themselves, so a handle is usable without
//! calling it first. A pinned request resolves without touching the
//! registry. A `latest` request asks the registry once and then reuses the
//! answer, except in [`PackageHandle::update`], which always asks again.

use crate::error::{PackageError, Result};
use crate::installer::{InstallRequest, Installer, PackageSpec};
use crate::layout::CacheLayout;
use crate::manifest;
use crate::registry::VersionSource;
use semver::Version;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stencil_core::config::LATEST;
use tracing::{debug, info};

/// Version requested by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedVersion {
    /// Newest published version
    Latest,
    /// A concrete semantic version
    Exact(String),
}

impl RequestedVersion {
    /// Parse `latest` or a semantic version
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PackageError::invalid_request("package version is empty"));
        }
        if raw == LATEST {
            return Ok(Self::Latest);
        }
        Version::parse(raw).map_err(|e| {
            PackageError::invalid_request(format!(
                "version must be \"{}\" or a semantic version, got {:?}: {}",
                LATEST, raw, e
            ))
        })?;
        Ok(Self::Exact(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Latest => LATEST,
            Self::Exact(version) => version,
        }
    }
}

impl fmt::Display for RequestedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller input for a package handle
#[derive(Debug, Clone)]
pub struct PackageRequest {
    /// Package name, possibly scoped (`@scope/name`)
    pub name: String,

    /// `latest` or a semantic version
    pub version: String,

    /// Install root; the package location itself when unmanaged
    pub target_path: PathBuf,

    /// Store directory; `None` makes the package unmanaged
    pub store_dir: Option<PathBuf>,
}

impl PackageRequest {
    /// Request for an unmanaged package at `target_path`
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        target_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            target_path: target_path.into(),
            store_dir: None,
        }
    }

    /// Make the package cache-managed under `store_dir`
    pub fn with_store_dir(mut self, store_dir: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(store_dir.into());
        self
    }

    /// Check the request without touching the filesystem or network
    pub fn validate(&self) -> Result<RequestedVersion> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PackageError::invalid_request("package name is required"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(PackageError::invalid_request(format!(
                "package name {:?} contains whitespace",
                self.name
            )));
        }
        if self.target_path.as_os_str().is_empty() {
            return Err(PackageError::invalid_request("target path is required"));
        }
        if matches!(&self.store_dir, Some(dir) if dir.as_os_str().is_empty()) {
            return Err(PackageError::invalid_request("store directory is empty"));
        }
        RequestedVersion::parse(&self.version)
    }
}

/// Resolution state of a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Resolved(String),
}

/// Result of [`PackageHandle::update`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The target version is already cached; nothing was installed
    UpToDate { version: String },
    /// The target version was installed and is now the resolved version
    Updated { from: Option<String>, to: String },
    /// Unmanaged packages are never updated
    Unmanaged,
}

/// A package request bound to a version source and an installer
pub struct PackageHandle {
    name: String,
    requested: RequestedVersion,
    target_path: PathBuf,
    layout: Option<CacheLayout>,
    state: ResolutionState,
    source: Arc<dyn VersionSource>,
    installer: Arc<dyn Installer>,
}

impl fmt::Debug for PackageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageHandle")
            .field("name", &self.name)
            .field("requested", &self.requested)
            .field("target_path", &self.target_path)
            .field("layout", &self.layout)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PackageHandle {
    /// Validate `request` and create a handle; no I/O happens here
    pub fn new(
        request: PackageRequest,
        source: Arc<dyn VersionSource>,
        installer: Arc<dyn Installer>,
    ) -> Result<Self> {
        let requested = request.validate()?;

        Ok(Self {
            name: request.name.trim().to_string(),
            requested,
            target_path: request.target_path,
            layout: request.store_dir.map(CacheLayout::new),
            state: ResolutionState::Unresolved,
            source,
            installer,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requested_version(&self) -> &RequestedVersion {
        &self.requested
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Store directory, when cache-managed
    pub fn store_dir(&self) -> Option<&Path> {
        self.layout.as_ref().map(CacheLayout::store_dir)
    }

    pub fn is_managed(&self) -> bool {
        self.layout.is_some()
    }

    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    /// Concrete version, once resolved
    pub fn resolved_version(&self) -> Option<&str> {
        match &self.state {
            ResolutionState::Resolved(version) => Some(version),
            ResolutionState::Unresolved => None,
        }
    }

    /// Resolved version, or the requested one before resolution
    fn current_version(&self) -> &str {
        self.resolved_version()
            .unwrap_or_else(|| self.requested.as_str())
    }

    /// Cache directory for the current version, when cache-managed
    ///
    /// Always derived from the current version, never remembered.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.specific_cache_path(self.current_version())
    }

    /// Cache directory for an arbitrary version, leaving the handle untouched
    pub fn specific_cache_path(&self, version: &str) -> Option<PathBuf> {
        self.layout
            .as_ref()
            .map(|layout| layout.cache_path(&self.name, version))
    }

    /// Resolve the requested version to a concrete one
    ///
    /// Idempotent: once resolved, the version is reused without asking the
    /// registry again. Fails with [`PackageError::NoVersionAvailable`] when a
    /// `latest` request gets no answer from the registry.
    pub async fn resolve(&mut self) -> Result<&str> {
        if let ResolutionState::Unresolved = self.state {
            let version = match &self.requested {
                RequestedVersion::Exact(version) => version.clone(),
                RequestedVersion::Latest => {
                    debug!("Resolving latest version of {}", self.name);
                    self.source
                        .latest_version(&self.name)
                        .await
                        .ok_or_else(|| PackageError::no_version(&self.name))?
                }
            };
            debug!("Resolved {} to {}", self.name, version);
            self.state = ResolutionState::Resolved(version);
        }

        Ok(self.current_version())
    }

    /// Whether the package is present on disk
    ///
    /// Cache-managed packages are resolved first and checked at their cache
    /// directory; unmanaged packages are checked at the target path.
    pub async fn exists(&mut self) -> Result<bool> {
        if self.layout.is_none() {
            return Ok(self.target_path.exists());
        }

        self.resolve().await?;
        Ok(self.cache_dir().is_some_and(|dir| dir.exists()))
    }

    /// Install the resolved version
    pub async fn install(&mut self) -> Result<()> {
        self.ensure_store_dir().await?;
        let version = self.resolve().await?.to_string();

        info!("Installing {}@{}", self.name, version);
        let request = self.install_request(&version);
        self.installer
            .install(&request)
            .await
            .map_err(|source| PackageError::InstallFailure {
                package: self.name.clone(),
                version,
                source,
            })
    }

    /// Bring the cache up to date
    ///
    /// A `latest` request re-queries the registry every time. If the newest
    /// version's cache directory already exists the installer is not called.
    /// Otherwise the newest version is installed and, only on success, becomes
    /// the resolved version. A pinned request is never moved to another
    /// version; it is installed if missing.
    pub async fn update(&mut self) -> Result<UpdateOutcome> {
        if self.layout.is_none() {
            debug!("{} is unmanaged, skipping update", self.name);
            return Ok(UpdateOutcome::Unmanaged);
        }
        self.ensure_store_dir().await?;

        let target = match &self.requested {
            RequestedVersion::Latest => self
                .source
                .latest_version(&self.name)
                .await
                .ok_or_else(|| PackageError::no_version(&self.name))?,
            RequestedVersion::Exact(version) => version.clone(),
        };

        let target_path = self.specific_cache_path(&target);
        if target_path.is_some_and(|path| path.exists()) {
            debug!("{}@{} is already cached", self.name, target);
            self.state = ResolutionState::Resolved(target.clone());
            return Ok(UpdateOutcome::UpToDate { version: target });
        }

        info!("Updating {} to {}", self.name, target);
        let request = self.install_request(&target);
        self.installer
            .install(&request)
            .await
            .map_err(|source| PackageError::UpdateFailure {
                package: self.name.clone(),
                version: target.clone(),
                source,
            })?;

        let from = self
            .resolved_version()
            .filter(|previous| *previous != target)
            .map(String::from);
        self.state = ResolutionState::Resolved(target.clone());
        Ok(UpdateOutcome::Updated { from, to: target })
    }

    /// Absolute path of the package's entry file
    ///
    /// Searches from the cache directory (managed) or the target path
    /// (unmanaged) for the nearest manifest and returns its `main` entry.
    /// `Ok(None)` means there is nothing to execute.
    pub fn entry_point(&self) -> Result<Option<PathBuf>> {
        let search_dir = self
            .cache_dir()
            .unwrap_or_else(|| self.target_path.clone());
        manifest::entry_point(&search_dir)
    }

    async fn ensure_store_dir(&self) -> Result<()> {
        if let Some(store_dir) = self.store_dir() {
            tokio::fs::create_dir_all(store_dir).await?;
        }
        Ok(())
    }

    fn install_request(&self, version: &str) -> InstallRequest {
        InstallRequest {
            root: self.target_path.clone(),
            store_dir: self.store_dir().map(Path::to_path_buf),
            registry: self.source.registry().to_string(),
            packages: vec![PackageSpec {
                name: self.name.clone(),
                version: version.to_string(),
            }],
        }
    }
}
