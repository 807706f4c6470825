//! Package installation from the registry
//!
//! The [`Installer`] trait is the install primitive a [`crate::PackageHandle`]
//! delegates to. [`RegistryInstaller`] is the production implementation:
//!
//! 1. Look up the version's `dist` block in the registry document
//! 2. Download the tarball
//! 3. Verify its `sha512` integrity, falling back to the legacy `shasum`
//! 4. Extract it, dropping the tarball's top-level `package/` directory
//!
//! Cache-managed installs are extracted into a staging directory inside the
//! store and renamed into place, so a version directory either exists
//! complete or not at all. When another process wins the rename race the
//! install still counts as successful.

use crate::layout::CacheLayout;
use crate::registry::RegistryClient;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use sha1::Sha1;
use sha2::{Digest, Sha512};
use std::fs;
use std::path::{Component, Path, PathBuf};
use stencil_core::config::RegistryConfig;
use tar::Archive;
use tracing::{debug, info, warn};

/// A package to install at an exact version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
}

/// Arguments to the install primitive
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Install root (the unmanaged install location)
    pub root: PathBuf,

    /// Store directory for cache-managed installs
    pub store_dir: Option<PathBuf>,

    /// Registry base URL
    pub registry: String,

    /// Packages to install
    pub packages: Vec<PackageSpec>,
}

/// Install primitive used by package handles
#[async_trait]
pub trait Installer: Send + Sync {
    /// Install every package in `request`; any error aborts the install
    async fn install(&self, request: &InstallRequest) -> Result<()>;
}

/// Installer that downloads tarballs from an npm-compatible registry
#[derive(Debug, Clone, Default)]
pub struct RegistryInstaller {
    /// HTTP settings; the URL is taken from each request
    config: RegistryConfig,
}

impl RegistryInstaller {
    /// Create an installer sharing the CLI's registry HTTP settings
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    async fn install_one(
        &self,
        client: &RegistryClient,
        request: &InstallRequest,
        spec: &PackageSpec,
    ) -> Result<()> {
        let metadata = client.version_metadata(&spec.name, &spec.version).await?;
        let dist = metadata
            .dist
            .ok_or_else(|| anyhow!("{}@{} has no dist information", spec.name, spec.version))?;

        debug!("Downloading {}", dist.tarball);
        let data = client
            .http()
            .get(&dist.tarball)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to download {}", dist.tarball))?
            .bytes()
            .await
            .with_context(|| format!("Failed to read {}", dist.tarball))?;

        let package = format!("{}@{}", spec.name, spec.version);
        verify_integrity(
            &data,
            &package,
            dist.integrity.as_deref(),
            dist.shasum.as_deref(),
        )?;

        let destination = match &request.store_dir {
            Some(store_dir) => Destination::Store {
                store_dir: store_dir.clone(),
                cache_path: CacheLayout::new(store_dir).cache_path(&spec.name, &spec.version),
            },
            None => Destination::Root(request.root.clone()),
        };

        tokio::task::spawn_blocking(move || destination.extract(&data))
            .await
            .context("Extraction task panicked")??;

        info!("Installed {}", package);
        Ok(())
    }
}

#[async_trait]
impl Installer for RegistryInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<()> {
        let config = RegistryConfig {
            url: request.registry.clone(),
            ..self.config.clone()
        };
        let client = RegistryClient::new(&config)?;

        for spec in &request.packages {
            self.install_one(&client, request, spec).await?;
        }
        Ok(())
    }
}

/// Where a downloaded tarball ends up
enum Destination {
    /// Versioned directory inside the store, populated atomically
    Store {
        store_dir: PathBuf,
        cache_path: PathBuf,
    },
    /// Directly into the install root
    Root(PathBuf),
}

impl Destination {
    fn extract(&self, data: &[u8]) -> Result<()> {
        match self {
            Destination::Store {
                store_dir,
                cache_path,
            } => {
                fs::create_dir_all(store_dir)?;
                let staging = tempfile::Builder::new()
                    .prefix(".staging-")
                    .tempdir_in(store_dir)?;
                unpack_tarball(data, staging.path())?;

                if let Some(parent) = cache_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                match fs::rename(staging.path(), cache_path) {
                    Ok(()) => Ok(()),
                    Err(_) if cache_path.join(crate::manifest::MANIFEST_FILE).exists() => {
                        debug!(
                            "{} was installed concurrently, keeping existing copy",
                            cache_path.display()
                        );
                        Ok(())
                    }
                    Err(e) => Err(e).with_context(|| {
                        format!("Failed to move package into {}", cache_path.display())
                    }),
                }
            }
            Destination::Root(root) => {
                fs::create_dir_all(root)?;
                unpack_tarball(data, root)
            }
        }
    }
}

/// Verify downloaded content against the checksums the registry publishes.
///
/// A `sha512-` subresource integrity digest is preferred. Without one the
/// legacy hex `shasum` (SHA-1) is checked. When neither is published a
/// warning is logged and the content is accepted.
pub fn verify_integrity(
    content: &[u8],
    package: &str,
    integrity: Option<&str>,
    shasum: Option<&str>,
) -> Result<()> {
    let expected = integrity.and_then(|value| {
        value
            .split_whitespace()
            .find_map(|token| token.strip_prefix("sha512-"))
    });

    if let Some(expected) = expected {
        let actual = STANDARD.encode(Sha512::digest(content));
        if actual != expected {
            bail!(
                "Integrity check failed for {}: expected sha512-{}, got sha512-{}",
                package,
                expected,
                actual
            );
        }
        debug!("{} passed integrity check", package);
        return Ok(());
    }

    match shasum.map(str::trim).filter(|s| !s.is_empty()) {
        Some(expected) => {
            let actual = format!("{:x}", Sha1::digest(content));
            if !actual.eq_ignore_ascii_case(expected) {
                bail!(
                    "Integrity check failed for {}: expected shasum {}, got {}",
                    package,
                    expected,
                    actual
                );
            }
            debug!("{} passed shasum check", package);
        }
        None => warn!("No checksum published for {}, skipping check", package),
    }

    Ok(())
}

/// Extract a gzip tarball into `dest`, dropping each entry's first path component
pub fn unpack_tarball(data: &[u8], dest: &Path) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(data));

    for entry in archive.entries().context("Failed to read package tarball")? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let Some(relative) = strip_top_level(&path) else {
            debug!("Skipping tarball entry: {}", path.display());
            continue;
        };

        let target = dest.join(&relative);
        let kind = entry.header().entry_type();
        if kind.is_dir() {
            fs::create_dir_all(&target)?;
        } else if kind.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            entry
                .unpack(&target)
                .with_context(|| format!("Failed to extract {}", relative.display()))?;
        } else {
            debug!("Skipping unsupported tarball entry: {}", path.display());
        }
    }

    Ok(())
}

/// Path below the tarball's top-level directory, or `None` for the top-level
/// directory itself and for anything that could escape the destination.
fn strip_top_level(path: &Path) -> Option<PathBuf> {
    let mut components = path.components().filter(|c| !matches!(c, Component::CurDir));
    match components.next() {
        Some(Component::Normal(_)) => {}
        _ => return None,
    }

    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            _ => return None,
        }
    }

    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}
