//! Install command.

use anyhow::Result;
use clap::Args;
use gpk_install::{Environment, InstallOptions, Package};
use std::process::ExitCode;
use std::sync::Arc;

/// Arguments for the install command.
#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// Additional dependency sources to install (git URLs or alias
    /// shorthands); with none, the manifest's dependencies are installed
    #[arg(value_name = "SOURCE", num_args = 0..=1024)]
    pub sources: Vec<String>,

    /// Skip dev dependencies
    #[arg(long)]
    pub production: bool,

    /// Operate on the global package directory
    #[arg(short = 'g', long)]
    pub global: bool,
}

/// Run the install command.
pub fn run(args: &InstallArgs, env: &Arc<Environment>) -> Result<ExitCode> {
    let opts = InstallOptions {
        production: args.production,
    };
    let root = target_package(env, args.global)?;

    if args.sources.is_empty() {
        root.install(&opts)?;
    } else {
        root.install_sources(&args.sources, &opts)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// The package an install or uninstall operates on: the enclosing package
/// of the working directory, or the global directory with `-g`.
pub fn target_package(env: &Arc<Environment>, global: bool) -> Result<Arc<Package>> {
    if global {
        env.ensure()?;
        // The global directory carries a synthetic root manifest.
        if !env.global().join("package.json").is_file() {
            Package::init(env.global())?;
        }
        let pkg = Package::from_directory(env.global(), false, Arc::clone(env), None)?;
        return Ok(Arc::new(pkg));
    }

    let cwd = std::env::current_dir()?;
    let pkg = Package::from_directory(&cwd, true, Arc::clone(env), None)?;
    Ok(Arc::new(pkg))
}
