//! Configuration loading and management

mod loader;
mod runtime;

pub use loader::{ConfigLoader, Settings, CONFIG_FILE, DEFAULT_CLI_HOME};
pub use runtime::{
    CacheConfig, CommandPackage, RegistryConfig, RuntimeConfig, UpdateCheckConfig, LATEST,
};
