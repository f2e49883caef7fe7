//! Rebuild command.

use anyhow::Result;
use clap::Args;
use gpk_install::{Environment, Package};
use std::process::ExitCode;
use std::sync::Arc;

/// Arguments for the rebuild command.
#[derive(Args, Debug, Clone)]
pub struct RebuildArgs {}

/// Re-run post-install scripts across the installed tree, deepest first,
/// without fetching anything.
pub fn run(_args: &RebuildArgs, env: &Arc<Environment>) -> Result<ExitCode> {
    env.ensure()?;
    let cwd = std::env::current_dir()?;
    let pkg = Package::from_directory(&cwd, true, Arc::clone(env), None)?;
    pkg.rebuild()?;
    Ok(ExitCode::SUCCESS)
}
