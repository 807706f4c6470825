//! Init command

use anyhow::{bail, Context, Result};
use dialoguer::Confirm;
use std::fs;
use std::path::Path;
use stencil_core::Settings;
use tracing::debug;

use super::exec::{self, DispatchPayload};
use crate::cli::InitArgs;
use crate::output;

/// Command name the init package is configured under
const COMMAND: &str = "init";

pub async fn run(args: InitArgs, settings: &Settings) -> Result<i32> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;

    if !args.force && !is_dir_empty(&cwd)? {
        if !console::user_attended() {
            bail!(
                "Current directory {} is not empty. Use --force to initialize anyway",
                cwd.display()
            );
        }

        let confirmed = Confirm::new()
            .with_prompt("Current directory is not empty. Continue creating the project here?")
            .default(false)
            .interact()?;

        if !confirmed {
            output::info("Initialization cancelled");
            return Ok(0);
        }
    }

    if let Some(name) = &args.project_name {
        output::kv("Project", name);
    }

    exec::run(settings, COMMAND, &payload(&args)).await
}

/// Arguments handed to the init package
fn payload(args: &InitArgs) -> DispatchPayload {
    let payload = match &args.project_name {
        Some(name) => DispatchPayload::new(COMMAND).arg(name.as_str()),
        None => DispatchPayload::new(COMMAND),
    };
    payload.option("force", args.force)
}

/// True when `dir` has nothing but hidden files and `node_modules`
fn is_dir_empty(dir: &Path) -> Result<bool> {
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

    for entry in entries {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with('.') && name != "node_modules" {
            debug!("{} is not empty: found {}", dir.display(), name);
            return Ok(false);
        }
    }
    Ok(true)
}
