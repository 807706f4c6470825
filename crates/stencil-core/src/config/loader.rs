//! Hierarchical configuration loader with precedence
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Built-in defaults
//! 2. `{cli_home}/config.yaml`
//! 3. `~/.env` (read into memory, never exported to the process environment)
//! 4. Environment variables (`STENCIL_*` prefix)
//! 5. CLI flags (handled by caller via [`Settings::with_target_path`])

use crate::config::runtime::{CommandPackage, RuntimeConfig};
use crate::error::{Error, Result};
use crate::utils::get_home_dir;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default CLI home directory name, relative to the user home
pub const DEFAULT_CLI_HOME: &str = ".stencil";

/// Name of the optional YAML config file inside the CLI home
pub const CONFIG_FILE: &str = "config.yaml";

const ENV_HOME: &str = "STENCIL_HOME";
const ENV_TARGET_PATH: &str = "STENCIL_TARGET_PATH";
const ENV_REGISTRY: &str = "STENCIL_REGISTRY";
const ENV_HTTP_TIMEOUT: &str = "STENCIL_HTTP_TIMEOUT_SECS";
const ENV_NO_UPDATE_CHECK: &str = "STENCIL_NO_UPDATE_CHECK";

/// Fully resolved settings passed explicitly to the package and dispatch layers
#[derive(Debug, Clone)]
pub struct Settings {
    /// Current user's home directory
    pub user_home: PathBuf,

    /// CLI home directory (holds `config.yaml` and the package cache)
    pub cli_home: PathBuf,

    /// Local package path; when set the cache is bypassed entirely
    pub target_path: Option<PathBuf>,

    /// Runtime configuration
    pub runtime: RuntimeConfig,
}

impl Settings {
    /// Install root for cache-managed packages
    pub fn dependencies_dir(&self) -> PathBuf {
        self.cli_home.join(&self.runtime.cache.dependencies_dir)
    }

    /// Store directory holding versioned package directories
    pub fn store_dir(&self) -> PathBuf {
        self.dependencies_dir().join(&self.runtime.cache.store_dir)
    }

    /// Registry base URL
    pub fn registry(&self) -> &str {
        &self.runtime.registry.url
    }

    /// Package backing a CLI command
    pub fn command_package(&self, command: &str) -> Option<&CommandPackage> {
        self.runtime.commands.get(command)
    }

    /// Override the target path (CLI flag, highest precedence)
    pub fn with_target_path(mut self, target_path: Option<PathBuf>) -> Self {
        if let Some(path) = target_path.filter(|p| !p.as_os_str().is_empty()) {
            self.target_path = Some(path);
        }
        self
    }
}

/// Configuration hierarchy loader
pub struct ConfigLoader {
    /// Current user's home directory
    user_home: PathBuf,
}

impl ConfigLoader {
    /// Create a loader rooted at the current user's home directory
    ///
    /// Fails when the home directory cannot be determined or does not exist.
    pub fn new() -> Result<Self> {
        let user_home = get_home_dir()?;
        Self::with_home(user_home)
    }

    /// Create a loader rooted at a custom home directory
    pub fn with_home(user_home: impl Into<PathBuf>) -> Result<Self> {
        let user_home = user_home.into();
        if !user_home.is_dir() {
            return Err(Error::home_not_found(user_home.display().to_string()));
        }
        Ok(Self { user_home })
    }

    /// User home directory this loader reads from
    pub fn user_home(&self) -> &Path {
        &self.user_home
    }

    /// Load settings with hierarchical precedence
    pub fn load(&self) -> Result<Settings> {
        let env_source = EnvSource::new(self.read_dotenv()?);

        let cli_home = match env_source.get(ENV_HOME) {
            Some(home) if Path::new(&home).is_absolute() => PathBuf::from(home),
            Some(home) => self.user_home.join(home),
            None => self.user_home.join(DEFAULT_CLI_HOME),
        };
        debug!("CLI home: {}", cli_home.display());

        let mut runtime = RuntimeConfig::default();
        let config_path = cli_home.join(CONFIG_FILE);
        if config_path.is_file() {
            debug!("Loading config file: {}", config_path.display());
            let file_config = Self::load_yaml_file(&config_path)?;
            runtime = Self::merge_runtime_config(runtime, file_config);
        }

        let runtime = Self::apply_env_overrides(runtime, &env_source)?;
        let target_path = env_source.get(ENV_TARGET_PATH).map(PathBuf::from);

        Ok(Settings {
            user_home: self.user_home.clone(),
            cli_home,
            target_path,
            runtime,
        })
    }

    /// Read `~/.env` into a map, if present
    fn read_dotenv(&self) -> Result<HashMap<String, String>> {
        let path = self.user_home.join(".env");
        let mut vars = HashMap::new();
        if !path.is_file() {
            return Ok(vars);
        }

        debug!("Reading environment file: {}", path.display());
        let to_error = |source| Error::DotEnv {
            path: path.display().to_string(),
            source,
        };
        for item in dotenvy::from_path_iter(&path).map_err(to_error)? {
            let (key, value) = item.map_err(to_error)?;
            vars.insert(key, value);
        }
        Ok(vars)
    }

    /// Load a YAML file and parse it
    fn load_yaml_file(path: &Path) -> Result<RuntimeConfig> {
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content).map_err(|e| {
            Error::invalid_config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Merge two runtime configs (base is overridden by overlay)
    fn merge_runtime_config(base: RuntimeConfig, overlay: RuntimeConfig) -> RuntimeConfig {
        let mut commands = base.commands;
        commands.extend(overlay.commands);

        RuntimeConfig {
            registry: overlay.registry,
            cache: overlay.cache,
            update_check: overlay.update_check,
            commands,
        }
    }

    /// Apply environment variable overrides to runtime config
    fn apply_env_overrides(mut config: RuntimeConfig, env: &EnvSource) -> Result<RuntimeConfig> {
        if let Some(url) = env.get(ENV_REGISTRY) {
            config.registry.url = url;
        }

        if let Some(val) = env.get(ENV_HTTP_TIMEOUT) {
            config.registry.timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config(format!("{} must be a valid number", ENV_HTTP_TIMEOUT))
            })?;
        }

        if let Some(val) = env.get(ENV_NO_UPDATE_CHECK) {
            if matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                config.update_check.enabled = false;
            }
        }

        Ok(config)
    }
}

/// Process environment layered over the contents of `~/.env`
struct EnvSource {
    dotenv: HashMap<String, String>,
}

impl EnvSource {
    fn new(dotenv: HashMap<String, String>) -> Self {
        Self { dotenv }
    }

    /// Non-empty value for `key`, process environment first
    fn get(&self, key: &str) -> Option<String> {
        env::var(key)
            .ok()
            .or_else(|| self.dotenv.get(key).cloned())
            .filter(|v| !v.is_empty())
    }
}
