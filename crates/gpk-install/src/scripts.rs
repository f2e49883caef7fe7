//! Manifest script execution.
//!
//! Scripts are shell command strings run through the platform default
//! shell (`sh -c` on Unix, `cmd /C` on Windows). Output goes to per-script
//! log files under the environment's log directory unless `TEST_LOG` is
//! truthy, in which case the child inherits the parent's stdio.

use crate::environment::Environment;
use gpk_core::{Error, Manifest, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Name of the post-install lifecycle script.
pub const INSTALL_SCRIPT: &str = "install";

/// Run a named script from a manifest, appending `args` to the command.
///
/// Returns the child's exit code.
///
/// # Errors
/// `NoSuchScript` when the manifest has no script by that name; `Io` when
/// the shell cannot be spawned.
pub fn run_script(
    env: &Environment,
    dir: &Path,
    manifest: &Manifest,
    name: &str,
    args: &[String],
) -> Result<i32> {
    let command = manifest
        .scripts
        .get(name)
        .ok_or_else(|| Error::NoSuchScript {
            name: name.to_string(),
        })?;

    let command = if args.is_empty() {
        command.to_string()
    } else {
        format!("{command} {}", args.join(" "))
    };

    info!(script = name, package = %manifest.name, "running script");
    let status = spawn_shell(env, dir, &manifest.name, name, &command)?;
    let code = status.code().unwrap_or(1);
    debug!(script = name, code, "script finished");
    Ok(code)
}

/// Run the post-install hook for a freshly materialized package, if it has
/// one. A failing hook is reported but does not abort the install;
/// `rebuild` exists to retry it.
pub fn run_install_hook(env: &Environment, dir: &Path, manifest: &Manifest) -> Result<()> {
    if manifest.scripts.get(INSTALL_SCRIPT).is_none() {
        return Ok(());
    }
    match run_script(env, dir, manifest, INSTALL_SCRIPT, &[]) {
        Ok(0) => Ok(()),
        Ok(code) => {
            warn!(package = %manifest.name, code, "install script failed");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Spawn a command string through the platform shell.
fn spawn_shell(
    env: &Environment,
    dir: &Path,
    package: &str,
    script: &str,
    command: &str,
) -> Result<std::process::ExitStatus> {
    let (shell, flag) = if cfg!(windows) {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    };

    let mut cmd = Command::new(shell);
    cmd.arg(flag)
        .arg(command)
        .current_dir(dir)
        .stdin(Stdio::null());

    if env.test_log() {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        let log_path = env.logs_dir().join(format!("{package}-{script}.log"));
        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| Error::io(&log_path, e))?;
        let log_err = log.try_clone().map_err(|e| Error::io(&log_path, e))?;
        cmd.stdout(Stdio::from(log)).stderr(Stdio::from(log_err));
    }

    cmd.status().map_err(|e| Error::io(dir, e))
}
