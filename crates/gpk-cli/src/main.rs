//! gpk - a git-native package manager.
//!
//! Every dependency is a git remote plus a version or revision selector:
//! no registry, no tarball mirror, no server-side metadata. Packages are
//! fetched with git, exported, and laid out under `node_modules/`.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod commands;

use clap::Parser;
use commands::{Cli, Commands};
use gpk_install::Environment;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let env = Arc::new(Environment::from_env());

    match run_command(&cli, &env) {
        Ok(code) => code,
        Err(err) => {
            let chain: &(dyn std::error::Error + 'static) = err.as_ref();
            env.error(chain);
            ExitCode::FAILURE
        }
    }
}

fn run_command(cli: &Cli, env: &Arc<Environment>) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Commands::Init(args) => commands::init::run(args, env),
        Commands::Install(args) => commands::install::run(args, env),
        Commands::Uninstall(args) => commands::uninstall::run(args, env),
        Commands::Rebuild(args) => commands::rebuild::run(args, env),
        Commands::Run(args) => commands::run::run(args, env),
        Commands::Test(args) => commands::run::run_test(args, env),
    }
}
