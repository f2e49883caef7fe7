//! Uninstall command.

use crate::commands::install::target_package;
use anyhow::Result;
use clap::Args;
use gpk_install::Environment;
use std::process::ExitCode;
use std::sync::Arc;

/// Arguments for the uninstall command.
#[derive(Args, Debug, Clone)]
pub struct UninstallArgs {
    /// Installed dependencies to remove
    #[arg(value_name = "PKG", required = true)]
    pub packages: Vec<String>,

    /// Operate on the global package directory
    #[arg(short = 'g', long)]
    pub global: bool,
}

/// Run the uninstall command.
pub fn run(args: &UninstallArgs, env: &Arc<Environment>) -> Result<ExitCode> {
    let root = target_package(env, args.global)?;
    let removed = root.uninstall(&args.packages)?;
    println!("removed {removed} package(s)");
    Ok(ExitCode::SUCCESS)
}
