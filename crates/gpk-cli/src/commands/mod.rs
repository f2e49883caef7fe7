//! CLI commands for gpk.

pub mod init;
pub mod install;
pub mod rebuild;
pub mod run;
pub mod uninstall;

use clap::{Parser, Subcommand};

/// gpk - a git-native package manager
///
/// Dependencies are git remotes plus version or revision selectors,
/// resolved through each manifest's own alias table and materialized
/// under node_modules/.
#[derive(Parser, Debug)]
#[command(name = "gpk")]
#[command(version)]
#[command(about = "A git-native package manager", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Do not output any message
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Increase the verbosity of messages: -v for info, -vv for debug, -vvv for trace
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a minimal package.json in the current directory
    Init(init::InitArgs),

    /// Install the enclosing package's dependencies, or the named sources
    #[command(visible_alias = "i")]
    Install(install::InstallArgs),

    /// Remove installed dependencies from node_modules
    #[command(visible_alias = "rm")]
    Uninstall(uninstall::UninstallArgs),

    /// Re-run post-install scripts for every installed dependency
    #[command(visible_alias = "build", alias = "rb")]
    Rebuild(rebuild::RebuildArgs),

    /// Run a script from the manifest
    Run(run::RunArgs),

    /// Run the test script
    #[command(visible_alias = "t", alias = "tst")]
    Test(run::TestArgs),
}
