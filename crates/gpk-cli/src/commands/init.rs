//! Init command.

use anyhow::Result;
use clap::Args;
use gpk_install::{Environment, Package};
use std::process::ExitCode;
use std::sync::Arc;

/// Arguments for the init command.
#[derive(Args, Debug, Clone)]
pub struct InitArgs {}

/// Create a minimal manifest in the current directory.
pub fn run(_args: &InitArgs, _env: &Arc<Environment>) -> Result<ExitCode> {
    let cwd = std::env::current_dir()?;
    Package::init(&cwd)?;
    println!("wrote {}", cwd.join("package.json").display());
    Ok(ExitCode::SUCCESS)
}
