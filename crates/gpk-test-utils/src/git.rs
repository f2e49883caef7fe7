//! Git repository fixtures.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Run git in `dir`, returning trimmed stdout.
fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .with_context(|| format!("failed to run git {args:?}"))?;

    if !output.status.success() {
        bail!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// A temporary git repository.
#[derive(Debug)]
pub struct TempGitRepo {
    _dir: TempDir,
    path: PathBuf,
}

impl TempGitRepo {
    /// Create a new empty repository with a test committer configured.
    pub fn new() -> Result<Self> {
        let dir = tempdir().context("failed to create temp directory")?;
        let path = dir.path().to_path_buf();
        init_repo(&path)?;
        Ok(Self { _dir: dir, path })
    }

    /// Repository path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a file, creating parent directories.
    pub fn write_file(&self, relative: &str, content: &str) -> Result<()> {
        write_file(&self.path, relative, content)
    }

    /// Stage everything and commit; returns the commit hash.
    pub fn commit_all(&self, message: &str) -> Result<String> {
        commit_all(&self.path, message)
    }

    /// Create a lightweight tag at HEAD.
    pub fn tag(&self, name: &str) -> Result<()> {
        git(&self.path, &["tag", name])?;
        Ok(())
    }
}

/// A directory of named git package repositories, usable as the target of
/// a `file:` remote alias.
///
/// Each package lives at `<root>/<name>` with its clone source at
/// `<root>/<name>/.git`, which is exactly what the `local:` alias form
/// resolves to.
#[derive(Debug)]
pub struct RepoFarm {
    dir: TempDir,
}

impl RepoFarm {
    /// Create an empty farm.
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempdir().context("failed to create repo farm")?,
        })
    }

    /// The datadir that a `file:` alias should point at.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The `file:` alias base URL for this farm.
    #[must_use]
    pub fn alias_base(&self) -> String {
        format!("file:{}", self.root().display())
    }

    /// Create a package repository with the given manifest, committed and
    /// tagged `v<version>`. The manifest's `version` field must match.
    pub fn create_package(&self, name: &str, version: &str, manifest: &serde_json::Value) -> Result<PathBuf> {
        let path = self.root().join(name);
        std::fs::create_dir_all(&path)?;
        init_repo(&path)?;
        self.add_version_at(&path, version, manifest)?;
        Ok(path)
    }

    /// Add a new tagged version to an existing package repository.
    pub fn add_version(&self, name: &str, version: &str, manifest: &serde_json::Value) -> Result<()> {
        let path = self.root().join(name);
        self.add_version_at(&path, version, manifest)
    }

    fn add_version_at(&self, path: &Path, version: &str, manifest: &serde_json::Value) -> Result<()> {
        write_file(
            path,
            "package.json",
            &format!("{}\n", serde_json::to_string_pretty(manifest)?),
        )?;
        commit_all(path, &format!("release {version}"))?;
        git(path, &["tag", &format!("v{version}")])?;
        Ok(())
    }
}

fn init_repo(path: &Path) -> Result<()> {
    git(path, &["init", "--quiet"])?;
    // Pin the unborn branch name; tests rely on `master` existing.
    git(path, &["symbolic-ref", "HEAD", "refs/heads/master"])?;
    git(path, &["config", "user.email", "test@example.com"])?;
    git(path, &["config", "user.name", "Test User"])?;
    git(path, &["config", "commit.gpgsign", "false"])?;
    Ok(())
}

fn write_file(root: &Path, relative: &str, content: &str) -> Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)?;
    Ok(())
}

fn commit_all(path: &Path, message: &str) -> Result<String> {
    git(path, &["add", "-A"])?;
    git(path, &["commit", "--quiet", "-m", message, "--allow-empty"])?;
    git(path, &["rev-parse", "HEAD"])
}
