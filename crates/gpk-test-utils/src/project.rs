//! Temporary project fixtures.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Build a `package.json` value.
///
/// `deps` and `remotes` keep their slice order, which matters to the
/// installer.
#[must_use]
pub fn package_json(
    name: &str,
    version: &str,
    remotes: &[(&str, &str)],
    deps: &[(&str, &str)],
) -> Value {
    let mut manifest = json!({
        "name": name,
        "version": version,
    });
    if !remotes.is_empty() {
        let map: serde_json::Map<String, Value> = remotes
            .iter()
            .map(|(k, v)| ((*k).to_string(), json!(v)))
            .collect();
        manifest["remotes"] = Value::Object(map);
    }
    if !deps.is_empty() {
        let map: serde_json::Map<String, Value> = deps
            .iter()
            .map(|(k, v)| ((*k).to_string(), json!(v)))
            .collect();
        manifest["dependencies"] = Value::Object(map);
    }
    manifest
}

/// A temporary project directory with a manifest, cleaned up on drop.
#[derive(Debug)]
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    /// Create a project with the given manifest at its root.
    pub fn new(manifest: &Value) -> Result<Self> {
        let dir = tempdir().context("failed to create temp project")?;
        let project = Self { dir };
        project.write_manifest(manifest)?;
        Ok(project)
    }

    /// Project root.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Overwrite the project manifest.
    pub fn write_manifest(&self, manifest: &Value) -> Result<()> {
        let json = format!("{}\n", serde_json::to_string_pretty(manifest)?);
        std::fs::write(self.path().join("package.json"), json)
            .context("failed to write package.json")
    }

    /// Create a file under the project root, creating parents.
    pub fn create_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Create a directory under the project root.
    pub fn create_dir(&self, relative: &str) -> Result<PathBuf> {
        let path = self.path().join(relative);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Whether a relative path exists under the project root.
    #[must_use]
    pub fn has(&self, relative: &str) -> bool {
        self.path().join(relative).exists()
    }
}
