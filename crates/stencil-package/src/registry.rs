//! Registry client and version lookup
//!
//! Speaks the npm-compatible document API:
//!
//! ```text
//! GET {registry}/{package}  ->  { "versions": { "1.0.0": { "dist": { ... } }, ... } }
//! ```
//!
//! Version lookups never fail: a network error or a non-success status is
//! logged and treated as "no version information available". Callers that
//! need the failure itself (the installer) use [`RegistryClient::fetch_package_info`].

use crate::error::{PackageError, Result};
use crate::versions::{max_satisfying, max_version};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use stencil_core::config::RegistryConfig;
use tracing::{debug, warn};

/// Package document as served by the registry
///
/// Version entries are kept as raw JSON so one malformed entry cannot hide
/// the others. [`RegistryClient::version_metadata`] parses the entry it needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageInfo {
    /// Published versions keyed by version string
    #[serde(default)]
    pub versions: BTreeMap<String, Value>,
}

/// Metadata for a single published version
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionMetadata {
    /// Tarball location and checksums
    #[serde(default)]
    pub dist: Option<DistInfo>,
}

/// Distribution block of a published version
#[derive(Debug, Clone, Deserialize)]
pub struct DistInfo {
    /// Tarball download URL
    pub tarball: String,

    /// Subresource integrity string (`sha512-<base64>`)
    #[serde(default)]
    pub integrity: Option<String>,

    /// Legacy SHA-1 hex digest, checked when no integrity string is published
    #[serde(default)]
    pub shasum: Option<String>,
}

/// Source of published version lists
///
/// Implemented by [`RegistryClient`]; tests substitute in-memory sources.
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Registry base URL handed to the installer
    fn registry(&self) -> &str;

    /// All published versions of `name`; empty when the registry is unavailable
    async fn list_versions(&self, name: &str) -> Vec<String>;

    /// Highest published version of `name`
    async fn latest_version(&self, name: &str) -> Option<String> {
        max_version(&self.list_versions(name).await)
    }

    /// Highest published version of `name` compatible with `^base`
    async fn latest_satisfying(&self, base: &str, name: &str) -> Option<String> {
        max_satisfying(base, &self.list_versions(name).await)
    }
}

/// HTTP client for an npm-compatible registry
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// HTTP client
    client: reqwest::Client,

    /// Registry base URL without trailing slash
    base_url: String,
}

impl RegistryClient {
    /// Create a client from registry configuration
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                PackageError::registry_unavailable(
                    config.url.as_str(),
                    format!("failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client for `url` with default settings
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let config = RegistryConfig {
            url: url.into(),
            ..RegistryConfig::default()
        };
        Self::new(&config)
    }

    /// Underlying HTTP client, shared with the installer for tarball downloads
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Document URL for `name`
    pub fn package_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }

    /// Fetch the package document, surfacing registry failures
    pub async fn fetch_package_info(&self, name: &str) -> Result<PackageInfo> {
        if name.trim().is_empty() {
            return Err(PackageError::invalid_request("package name is empty"));
        }

        let url = self.package_url(name);
        debug!("Fetching package info from: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PackageError::registry_unavailable(name, e.to_string()))?;

        if !response.status().is_success() {
            return Err(PackageError::registry_unavailable(
                name,
                format!("{} returned {}", url, response.status()),
            ));
        }

        response.json::<PackageInfo>().await.map_err(|e| {
            PackageError::registry_unavailable(name, format!("invalid registry response: {}", e))
        })
    }

    /// Fetch the package document, or `None` when the registry is unavailable
    pub async fn package_info(&self, name: &str) -> Option<PackageInfo> {
        match self.fetch_package_info(name).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Metadata of one published version
    pub async fn version_metadata(&self, name: &str, version: &str) -> Result<VersionMetadata> {
        let package = format!("{}@{}", name, version);
        let mut info = self.fetch_package_info(name).await?;
        let entry = info
            .versions
            .remove(version)
            .ok_or_else(|| PackageError::no_version(&package))?;

        serde_json::from_value(entry).map_err(|e| {
            PackageError::registry_unavailable(package, format!("invalid version metadata: {}", e))
        })
    }
}

#[async_trait]
impl VersionSource for RegistryClient {
    fn registry(&self) -> &str {
        &self.base_url
    }

    async fn list_versions(&self, name: &str) -> Vec<String> {
        self.package_info(name)
            .await
            .map(|info| info.versions.into_keys().collect())
            .unwrap_or_default()
    }
}
