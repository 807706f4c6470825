//! Command package dispatch
//!
//! Resolves the package configured for a command, makes sure it is cached
//! (install on first use, update afterwards), and runs its entry point in a
//! separate `node` process.
//!
//! Arguments reach the package as JSON data. The script passed to `node -e`
//! is a fixed string that reads the entry path and the payload from
//! `process.argv`, so nothing from the command line is ever spliced into
//! source text.

use anyhow::{anyhow, bail, Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stencil_core::{format_path, Settings};
use stencil_package::{
    PackageHandle, PackageRequest, RegistryClient, RegistryInstaller, UpdateOutcome,
};
use tokio::process::Command;
use tracing::debug;

use crate::cli::RunArgs;
use crate::output;

/// Node.js releases must be newer than this to run command packages
pub const LOWEST_NODE_VERSION: &str = "12.0.0";

/// Loads the entry module and calls its export with the parsed payload
const BOOTSTRAP: &str = "const [entry, payload] = process.argv.slice(1);\
Promise.resolve(require(entry)(JSON.parse(payload)))\
.catch((err) => { console.error(err && err.message ? err.message : err); process.exit(1); });";

/// Data handed to a command package's entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchPayload {
    /// Command name
    pub command: String,

    /// Positional arguments
    pub args: Vec<String>,

    /// Named options
    pub options: BTreeMap<String, Value>,
}

impl DispatchPayload {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Set a named option
    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize command arguments")
    }
}

/// Run a command package configured under `commands` in config.yaml
pub async fn run_configured(args: RunArgs, settings: &Settings) -> Result<i32> {
    let payload = args
        .args
        .iter()
        .fold(DispatchPayload::new(&args.command), |payload, arg| {
            payload.arg(arg.as_str())
        });
    run(settings, &args.command, &payload).await
}

/// Resolve, cache, and run the package behind `command`
pub async fn run(settings: &Settings, command: &str, payload: &DispatchPayload) -> Result<i32> {
    let mut handle = package_handle(settings, command)?;

    if handle.is_managed() {
        prepare_package(&mut handle).await?;
    }

    let Some(entry) = handle.entry_point()? else {
        output::warning(&format!(
            "Package {} declares no entry point, nothing to execute",
            handle.name()
        ));
        return Ok(0);
    };
    debug!("Entry point: {}", entry.display());

    let dispatcher = Dispatcher::locate()?;
    dispatcher.check_version().await?;
    dispatcher.run(&entry, payload).await
}

/// Build the handle for `command` from explicit settings
fn package_handle(settings: &Settings, command: &str) -> Result<PackageHandle> {
    let package = settings
        .command_package(command)
        .ok_or_else(|| anyhow!("No package is configured for command '{}'", command))?;

    let request = match &settings.target_path {
        Some(target_path) => {
            debug!("Using local package at {}", target_path.display());
            PackageRequest::new(&package.package, &package.version, target_path)
        }
        None => {
            let target_path = settings.dependencies_dir();
            let store_dir = settings.store_dir();
            debug!("targetPath: {}", target_path.display());
            debug!("storeDir: {}", store_dir.display());
            PackageRequest::new(&package.package, &package.version, target_path)
                .with_store_dir(store_dir)
        }
    };

    debug!("Registry: {}", settings.registry());
    let source = Arc::new(RegistryClient::new(&settings.runtime.registry)?);
    let installer = Arc::new(RegistryInstaller::new(settings.runtime.registry.clone()));
    let handle = PackageHandle::new(request, source, installer)?;
    debug!(
        "Command {} uses {}@{}",
        command,
        handle.name(),
        handle.requested_version()
    );
    Ok(handle)
}

/// Install the package on first use, otherwise bring it up to date
async fn prepare_package(handle: &mut PackageHandle) -> Result<()> {
    if handle.exists().await? {
        let spinner = output::spinner(&format!("Checking {} for updates...", handle.name()));
        let outcome = handle.update().await;
        spinner.finish_and_clear();

        match outcome? {
            UpdateOutcome::Updated { to, .. } => {
                output::success(&format!("Updated {} to {}", handle.name(), to))
            }
            UpdateOutcome::UpToDate { version } => {
                debug!("{}@{} is up to date", handle.name(), version)
            }
            UpdateOutcome::Unmanaged => {}
        }
    } else {
        let spinner = output::spinner(&format!("Installing {}...", handle.name()));
        let outcome = handle.install().await;
        spinner.finish_and_clear();
        outcome?;

        if let Some(version) = handle.resolved_version() {
            output::success(&format!("Installed {}@{}", handle.name(), version));
        }
    }
    Ok(())
}

/// Runs entry points with the Node.js runtime found on PATH
pub struct Dispatcher {
    node: PathBuf,
}

impl Dispatcher {
    /// Find `node` on PATH
    pub fn locate() -> Result<Self> {
        let node = which::which("node")
            .context("Node.js is required to run command packages but `node` was not found on PATH")?;
        Ok(Self { node })
    }

    /// Fail unless the runtime is newer than [`LOWEST_NODE_VERSION`]
    pub async fn check_version(&self) -> Result<()> {
        let output = Command::new(&self.node)
            .arg("--version")
            .output()
            .await
            .context("Failed to run `node --version`")?;
        let reported = String::from_utf8_lossy(&output.stdout);
        check_node_version(&reported)
    }

    /// Child process invocation for `entry` with `payload`
    pub fn command(&self, entry: &Path, payload: &DispatchPayload) -> Result<Command> {
        let mut command = Command::new(&self.node);
        command
            .arg("-e")
            .arg(BOOTSTRAP)
            .arg(format_path(entry))
            .arg(payload.to_json()?);
        Ok(command)
    }

    /// Run the entry point with inherited stdio and return its exit code
    pub async fn run(&self, entry: &Path, payload: &DispatchPayload) -> Result<i32> {
        let status = self
            .command(entry, payload)?
            .status()
            .await
            .with_context(|| format!("Failed to start {}", self.node.display()))?;
        debug!("Command package exited with {}", status);

        Ok(status.code().unwrap_or(1))
    }
}

/// Parse `node --version` output and compare against [`LOWEST_NODE_VERSION`]
fn check_node_version(reported: &str) -> Result<()> {
    let raw = reported.trim().trim_start_matches('v');
    let current = Version::parse(raw)
        .with_context(|| format!("Unrecognized Node.js version: {:?}", reported.trim()))?;
    let lowest = Version::parse(LOWEST_NODE_VERSION)?;

    if current <= lowest {
        bail!(
            "stencil requires a Node.js release newer than v{}, found v{}",
            LOWEST_NODE_VERSION,
            current
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::fs;
    use stencil_core::config::RuntimeConfig;
    use tempfile::TempDir;

    fn settings(temp: &TempDir, target_path: Option<PathBuf>) -> Settings {
        Settings {
            user_home: temp.path().to_path_buf(),
            cli_home: temp.path().join(".stencil"),
            target_path,
            runtime: RuntimeConfig::default(),
        }
    }

    #[test]
    fn test_payload_round_trip() {
        let payload = DispatchPayload::new("init")
            .arg("my-app")
            .option("force", true);
        let json = payload.to_json().unwrap();
        let decoded: DispatchPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(decoded.options["force"], Value::Bool(true));
    }

    #[test]
    fn test_hostile_arguments_stay_data() {
        let payload = DispatchPayload::new("init").arg("'); process.exit(9); ('");
        let dispatcher = Dispatcher {
            node: PathBuf::from("node"),
        };
        let command = dispatcher
            .command(Path::new("/cache/pkg/lib/index.js"), &payload)
            .unwrap();
        let args: Vec<&OsStr> = command.as_std().get_args().collect();

        assert_eq!(args[0], "-e");
        assert_eq!(args[1], BOOTSTRAP);
        assert_eq!(args[2], OsStr::new(&format_path(Path::new("/cache/pkg/lib/index.js"))));
        let decoded: DispatchPayload = serde_json::from_str(args[3].to_str().unwrap()).unwrap();
        assert_eq!(decoded.args, vec!["'); process.exit(9); ('"]);
    }

    #[test]
    fn test_check_node_version() {
        check_node_version("v18.17.1\n").unwrap();
        check_node_version("v12.0.1").unwrap();
        assert!(check_node_version("v12.0.0").is_err());
        assert!(check_node_version("v10.24.1").is_err());
        assert!(check_node_version("not node").is_err());
    }

    #[test]
    fn test_package_handle_is_managed_without_target_path() {
        let temp = TempDir::new().unwrap();
        let handle = package_handle(&settings(&temp, None), "init").unwrap();
        assert!(handle.is_managed());
        assert_eq!(handle.name(), "@stencil-cli/init");
        assert_eq!(
            handle.store_dir().unwrap(),
            temp.path().join(".stencil/dependencies/node_modules")
        );
    }

    #[test]
    fn test_package_handle_with_target_path_is_unmanaged() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("init-dev");
        let handle = package_handle(&settings(&temp, Some(local.clone())), "init").unwrap();
        assert!(!handle.is_managed());
        assert_eq!(handle.target_path(), local.as_path());
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let temp = TempDir::new().unwrap();
        let err = package_handle(&settings(&temp, None), "deploy").unwrap_err();
        assert!(err.to_string().contains("deploy"));
    }

    #[tokio::test]
    async fn test_local_package_without_entry_runs_nothing() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("init-dev");
        fs::create_dir_all(&local).unwrap();
        fs::write(local.join("package.json"), r#"{"name":"init-dev"}"#).unwrap();

        let code = run(
            &settings(&temp, Some(local)),
            "init",
            &DispatchPayload::new("init"),
        )
        .await
        .unwrap();
        assert_eq!(code, 0);
    }
}
