//! Error types for package resolution and caching

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using stencil-package's error type
pub type Result<T> = std::result::Result<T, PackageError>;

/// Errors raised while resolving, installing, or updating a package
#[derive(Error, Debug)]
pub enum PackageError {
    /// The package request failed validation
    #[error("Invalid package request: {message}")]
    InvalidRequest { message: String },

    /// The registry could not be reached or answered with a failure status
    #[error("Registry unavailable for {package}: {message}")]
    RegistryUnavailable { package: String, message: String },

    /// The registry returned no usable version for the package
    #[error("No published version found for {package}")]
    NoVersionAvailable { package: String },

    /// The installer rejected a fresh install
    #[error("Failed to install {package}@{version}")]
    InstallFailure {
        package: String,
        version: String,
        #[source]
        source: anyhow::Error,
    },

    /// The installer rejected an update
    #[error("Failed to update {package} to {version}")]
    UpdateFailure {
        package: String,
        version: String,
        #[source]
        source: anyhow::Error,
    },

    /// A package manifest exists but could not be parsed
    #[error("Invalid package manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackageError {
    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a registry unavailable error
    pub fn registry_unavailable(package: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RegistryUnavailable {
            package: package.into(),
            message: message.into(),
        }
    }

    /// Create a no version available error
    pub fn no_version(package: impl Into<String>) -> Self {
        Self::NoVersionAvailable {
            package: package.into(),
        }
    }
}
