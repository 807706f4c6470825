//! Startup checks run before every command
//!
//! 1. Log the CLI version
//! 2. Refuse to run as root
//! 3. Check the user home directory exists and load settings
//! 4. Warn when a newer compatible CLI release is published

use anyhow::{bail, Context, Result};
use camino::Utf8PathBuf;
use semver::Version;
use stencil_core::{ConfigLoader, Settings};
use stencil_package::{RegistryClient, VersionSource};
use tracing::debug;

use crate::output;

/// Current CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load settings and run the startup checks
pub async fn prepare(target_path: Option<Utf8PathBuf>) -> Result<Settings> {
    debug!("stencil {}", VERSION);
    check_root()?;

    let loader = ConfigLoader::new().context("Failed to locate the user home directory")?;
    debug!("User home: {}", loader.user_home().display());
    let settings = loader
        .load()
        .context("Failed to load configuration")?
        .with_target_path(target_path.map(Utf8PathBuf::into_std_path_buf));

    debug!("CLI home: {}", settings.cli_home.display());
    if let Some(target) = &settings.target_path {
        debug!("Target path: {}", target.display());
    }

    check_global_update(&settings).await;
    Ok(settings)
}

/// Fail when running with root privileges
///
/// Packages installed as root leave root-owned directories in the user's
/// cache, which later unprivileged runs cannot update.
fn check_root() -> Result<()> {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail
        let euid = unsafe { libc::geteuid() };
        ensure_not_root(euid)?;
    }
    Ok(())
}

#[cfg_attr(not(unix), allow(dead_code))]
fn ensure_not_root(euid: u32) -> Result<()> {
    if euid == 0 {
        bail!(
            "stencil must not be run as root. Re-run it as a regular user so the package cache stays writable"
        );
    }
    Ok(())
}

/// Warn when the registry publishes a newer release compatible with this one
///
/// Never fails: registry problems only mean no warning is shown.
async fn check_global_update(settings: &Settings) {
    let check = &settings.runtime.update_check;
    if !check.enabled {
        return;
    }

    let client = match RegistryClient::new(&settings.runtime.registry) {
        Ok(client) => client,
        Err(e) => {
            debug!("Skipping update check: {}", e);
            return;
        }
    };

    let latest = client.latest_satisfying(VERSION, &check.package).await;
    if let Some(message) = update_notice(VERSION, latest.as_deref(), &check.package) {
        output::warning(&message);
    }
}

/// Upgrade hint when `latest` is newer than `current`
fn update_notice(current: &str, latest: Option<&str>, package: &str) -> Option<String> {
    let latest = latest?;
    let newer = match (Version::parse(latest), Version::parse(current)) {
        (Ok(latest), Ok(current)) => latest > current,
        _ => false,
    };

    newer.then(|| {
        format!(
            "Please update {}: current version {}, latest version {}\n  Update with: npm install -g {}",
            package, current, latest, package
        )
    })
}
