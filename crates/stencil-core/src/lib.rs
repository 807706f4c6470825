//! # stencil-core
//!
//! Core library for the stencil CLI providing:
//! - Hierarchical configuration loading (defaults, `config.yaml`, `~/.env`, environment)
//! - The explicit `Settings` handed to the package and dispatch layers
//! - Shared error type and path utilities

pub mod config;
pub mod error;
pub mod utils;

pub use config::{ConfigLoader, RuntimeConfig, Settings};
pub use error::{Error, Result};
pub use utils::{format_path, get_home_dir, normalize_path};
