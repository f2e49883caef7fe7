//! Run and test commands.

use anyhow::Result;
use clap::Args;
use gpk_core::ErrorKind;
use gpk_install::{Environment, Package};
use std::process::ExitCode;
use std::sync::Arc;

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Script name from the manifest
    pub script: String,

    /// Arguments appended to the script command
    #[arg(value_name = "ARGS", trailing_var_arg = true)]
    pub args: Vec<String>,
}

/// Arguments for the test command.
#[derive(Args, Debug, Clone)]
pub struct TestArgs {}

/// Run a named manifest script, propagating its exit code.
pub fn run(args: &RunArgs, env: &Arc<Environment>) -> Result<ExitCode> {
    run_named(&args.script, &args.args, env)
}

/// `test` is `run test` with no extra arguments.
pub fn run_test(_args: &TestArgs, env: &Arc<Environment>) -> Result<ExitCode> {
    run_named("test", &[], env)
}

fn run_named(script: &str, args: &[String], env: &Arc<Environment>) -> Result<ExitCode> {
    env.ensure()?;
    let cwd = std::env::current_dir()?;
    let pkg = Package::from_directory(&cwd, true, Arc::clone(env), None)?;

    match pkg.run(script, args) {
        Ok(code) => Ok(exit_code(code)),
        // A missing script is reported, not raised.
        Err(err) if err.kind() == ErrorKind::NoSuchScript => {
            env.error(&err);
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
