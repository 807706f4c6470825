//! Runtime configuration types
//!
//! These types define everything the CLI reads from `config.yaml`: which
//! registry to talk to, how the package cache is laid out, the self-update
//! check, and which package backs each command.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version sentinel meaning "whatever the registry publishes as newest"
pub const LATEST: &str = "latest";

/// Complete runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Package registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Local package cache layout
    #[serde(default)]
    pub cache: CacheConfig,

    /// Self-update check performed on startup
    #[serde(default)]
    pub update_check: UpdateCheckConfig,

    /// Command name to package mapping
    #[serde(default = "default_commands")]
    pub commands: BTreeMap<String, CommandPackage>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            cache: CacheConfig::default(),
            update_check: UpdateCheckConfig::default(),
            commands: default_commands(),
        }
    }
}

/// Package registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryConfig {
    /// Base URL of the registry
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User agent string for registry requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_registry_url() -> String {
    "https://registry.npmjs.org".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!(
        "stencil/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Package cache layout under the CLI home directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Directory (relative to the CLI home) that serves as install root
    #[serde(default = "default_dependencies_dir")]
    pub dependencies_dir: String,

    /// Directory (relative to the install root) holding versioned packages
    #[serde(default = "default_store_dir")]
    pub store_dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dependencies_dir: default_dependencies_dir(),
            store_dir: default_store_dir(),
        }
    }
}

fn default_dependencies_dir() -> String {
    "dependencies".to_string()
}
fn default_store_dir() -> String {
    "node_modules".to_string()
}

/// Startup check for a newer compatible CLI release
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UpdateCheckConfig {
    /// Whether the check runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Registry package that tracks CLI releases
    #[serde(default = "default_cli_package")]
    pub package: String,
}

impl Default for UpdateCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            package: default_cli_package(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_cli_package() -> String {
    "stencil-cli".to_string()
}

/// Package that implements a CLI command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandPackage {
    /// Registry package name, possibly scoped (`@scope/name`)
    pub package: String,

    /// Requested version, `latest` or a concrete semantic version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    LATEST.to_string()
}

fn default_commands() -> BTreeMap<String, CommandPackage> {
    let mut commands = BTreeMap::new();
    commands.insert(
        "init".to_string(),
        CommandPackage {
            package: "@stencil-cli/init".to_string(),
            version: default_version(),
        },
    );
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.registry.url, "https://registry.npmjs.org");
        assert_eq!(config.cache.dependencies_dir, "dependencies");
        assert_eq!(config.cache.store_dir, "node_modules");
        assert_eq!(config.commands["init"].package, "@stencil-cli/init");
        assert_eq!(config.commands["init"].version, LATEST);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
registry:
  url: "https://registry.example.com"
commands:
  add:
    package: "@acme/add"
    version: "1.2.0"
"#;
        let config: RuntimeConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.registry.url, "https://registry.example.com");
        assert_eq!(config.registry.timeout_secs, 30);
        assert_eq!(config.commands["add"].version, "1.2.0");
        assert!(config.update_check.enabled);
    }
}
