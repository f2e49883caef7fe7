//! Process-wide environment: directories and diagnostic streams.

use gpk_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the gpk home directory.
pub const ENV_HOME: &str = "GPK_HOME";
/// Environment variable naming the global install directory.
pub const ENV_GLOBAL: &str = "GPK_GLOBAL";
/// Environment variable naming the clone cache directory.
pub const ENV_CACHE: &str = "GPK_CACHE";
/// Truthy values route script output to the parent's stdio instead of
/// log files. Test-time only.
pub const ENV_TEST_LOG: &str = "TEST_LOG";

/// Ambient configuration shared by every package in one invocation.
///
/// Read-mostly: constructed once, then only consulted.
#[derive(Debug)]
pub struct Environment {
    home: PathBuf,
    global: PathBuf,
    cache: PathBuf,
    test_log: bool,
}

impl Environment {
    /// Build the environment from process environment variables, falling
    /// back to `~/.gpk`.
    #[must_use]
    pub fn from_env() -> Self {
        let home = std::env::var_os(ENV_HOME).map_or_else(
            || {
                directories::BaseDirs::new().map_or_else(
                    || PathBuf::from(".gpk"),
                    |dirs| dirs.home_dir().join(".gpk"),
                )
            },
            PathBuf::from,
        );
        Self::with_home(home)
    }

    /// Build an environment rooted at an explicit home directory.
    /// `GPK_GLOBAL` and `GPK_CACHE` still override the derived defaults.
    #[must_use]
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let global = std::env::var_os(ENV_GLOBAL)
            .map_or_else(|| home.join("global"), PathBuf::from);
        let cache = std::env::var_os(ENV_CACHE)
            .map_or_else(|| home.join("cache"), PathBuf::from);
        let test_log = std::env::var(ENV_TEST_LOG)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        Self {
            home,
            global,
            cache,
            test_log,
        }
    }

    /// Home directory (`~/.gpk`).
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Global install directory.
    #[must_use]
    pub fn global(&self) -> &Path {
        &self.global
    }

    /// Clone cache directory.
    #[must_use]
    pub fn cache(&self) -> &Path {
        &self.cache
    }

    /// Directory for per-script log files.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    /// Whether script output goes to the parent's stdio.
    #[must_use]
    pub const fn test_log(&self) -> bool {
        self.test_log
    }

    /// Create the home, global, cache, and log directories.
    ///
    /// Acquisition only: a failure partway leaves whatever was created.
    ///
    /// # Errors
    /// Returns `Io` on create failure.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.home, &self.global, &self.cache, &self.logs_dir()] {
            std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        debug!(home = %self.home.display(), "environment ready");
        Ok(())
    }

    /// Write a diagnostic for an error chain to stderr.
    pub fn error(&self, err: &dyn std::error::Error) {
        eprintln!("gpk: error: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("gpk:   caused by: {cause}");
            source = cause.source();
        }
    }
}

/// Truthy interpretation for stream-routing flags.
fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
