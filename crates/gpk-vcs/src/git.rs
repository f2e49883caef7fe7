//! Git operations via the `git` CLI.
//!
//! The client resolves version ranges against remote tags, materializes
//! working copies in the clone cache, and exports commits as tarballs.
//! Shallow clones are used whenever a branch or tag name is known; a full
//! clone plus detached checkout is the fallback for raw commits.

use crate::cache::CloneCache;
use crate::error::{Result, VcsError};
use semver::Version;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, trace, warn};

/// A semver-parseable tag on a remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTag {
    /// Tag name as it appears on the remote (`v1.1.7`, `1.1.7`).
    pub name: String,
    /// Parsed version.
    pub version: Version,
    /// Peeled commit the tag points at.
    pub commit: String,
}

/// Git client rooted at a clone cache.
#[derive(Debug, Clone)]
pub struct GitClient {
    cache: CloneCache,
}

impl GitClient {
    /// Create a client whose working copies live under `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache: CloneCache::new(cache_dir),
        }
    }

    /// The underlying clone cache.
    #[must_use]
    pub fn cache(&self) -> &CloneCache {
        &self.cache
    }

    /// Check whether a string is a full commit hash.
    #[must_use]
    pub fn is_commit_hash(s: &str) -> bool {
        s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Enumerate the remote's semver tags, ascending by version.
    ///
    /// Tags that do not parse as a semantic version (with or without a
    /// leading `v`) are skipped.
    ///
    /// # Errors
    /// `LsRemoteFailed` when the remote cannot be reached.
    pub fn ls_remote_tags(&self, url: &str) -> Result<Vec<RemoteTag>> {
        debug!(url, "listing remote tags");
        let output = run_git(&["ls-remote", "--tags", url], None)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_remote_error(&stderr, url, |reason| {
                VcsError::LsRemoteFailed {
                    url: url.to_string(),
                    reason,
                }
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut tags = parse_tag_listing(&stdout)
            .into_iter()
            .filter_map(|(name, commit)| {
                let version = Version::parse(name.trim_start_matches('v')).ok()?;
                Some(RemoteTag {
                    name,
                    version,
                    commit,
                })
            })
            .collect::<Vec<_>>();
        tags.sort_by(|a, b| a.version.cmp(&b.version));

        trace!(url, count = tags.len(), "semver tags found");
        Ok(tags)
    }

    /// Resolve a branch, tag, or commit to a commit hash.
    ///
    /// A 40-hex string passes through untouched. For refs, the peeled
    /// (`^{}`) object is preferred so annotated tags resolve to the commit
    /// they mark.
    ///
    /// # Errors
    /// `ReferenceNotFound` when the remote knows no such ref.
    pub fn resolve_ref(&self, url: &str, reference: &str) -> Result<String> {
        if Self::is_commit_hash(reference) {
            return Ok(reference.to_string());
        }

        debug!(url, reference, "resolving ref");
        let peeled = format!("{reference}^{{}}");
        let output = run_git(&["ls-remote", url, reference, &peeled], None)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_remote_error(&stderr, url, |reason| {
                VcsError::LsRemoteFailed {
                    url: url.to_string(),
                    reason,
                }
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut plain = None;
        for line in stdout.lines() {
            let Some((sha, refname)) = line.split_once('\t') else {
                continue;
            };
            if refname.ends_with("^{}") {
                // Peeled wins outright.
                return Ok(sha.to_string());
            }
            if plain.is_none() {
                plain = Some(sha.to_string());
            }
        }

        plain.ok_or_else(|| VcsError::ReferenceNotFound {
            reference: reference.to_string(),
            url: url.to_string(),
        })
    }

    /// Materialize a working copy of `commit` from `url` in the cache and
    /// return its path.
    ///
    /// `hint` is a branch or tag name known to point at `commit`; when
    /// given, a shallow single-branch clone is attempted first.
    ///
    /// # Errors
    /// `CloneFailed`/`CheckoutFailed` on git failures.
    pub fn checkout(&self, url: &str, commit: &str, hint: Option<&str>) -> Result<PathBuf> {
        let dest = self.cache.entry_dir(url, commit);
        if self.cache.has_entry(url, commit) {
            debug!(url, commit, "cache hit");
            return Ok(dest);
        }

        self.cache.prepare(url)?;
        if dest.exists() {
            // Stale partial clone from an interrupted run.
            std::fs::remove_dir_all(&dest).map_err(|e| VcsError::io(&dest, e))?;
        }

        if let Some(refname) = hint {
            match self.shallow_clone(url, refname, &dest) {
                Ok(head) if head == commit => {
                    debug!(url, commit, "shallow clone hit");
                    return Ok(dest);
                }
                Ok(head) => {
                    warn!(url, refname, %head, commit, "shallow clone head mismatch");
                    std::fs::remove_dir_all(&dest).map_err(|e| VcsError::io(&dest, e))?;
                }
                Err(err) => {
                    debug!(url, refname, %err, "shallow clone failed, falling back");
                    if dest.exists() {
                        std::fs::remove_dir_all(&dest).map_err(|e| VcsError::io(&dest, e))?;
                    }
                }
            }
        }

        self.full_clone(url, &dest)?;
        self.detach(&dest, commit)?;
        Ok(dest)
    }

    /// Export `commit` from a working copy as a plain tar archive.
    ///
    /// # Errors
    /// `ArchiveFailed` when `git archive` fails.
    pub fn export(&self, worktree: &Path, commit: &str, tar_path: &Path) -> Result<()> {
        debug!(worktree = %worktree.display(), commit, "exporting archive");
        let tar = tar_path.to_string_lossy();
        let output = run_git(
            &["archive", "--format=tar", "-o", tar.as_ref(), commit],
            Some(worktree),
        )?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VcsError::ArchiveFailed {
                commit: commit.to_string(),
                reason: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    /// HEAD commit of a working copy.
    ///
    /// # Errors
    /// `Command` when git cannot run.
    pub fn head_commit(dir: &Path) -> Result<String> {
        let output = run_git(&["rev-parse", "HEAD"], Some(dir))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VcsError::CheckoutFailed {
                reference: "HEAD".to_string(),
                reason: stderr.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn shallow_clone(&self, url: &str, refname: &str, dest: &Path) -> Result<String> {
        let dest_str = dest.to_string_lossy();
        let output = run_git(
            &[
                "clone",
                "--quiet",
                "--depth",
                "1",
                "--single-branch",
                "--branch",
                refname,
                url,
                dest_str.as_ref(),
            ],
            None,
        )?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_remote_error(&stderr, url, |reason| {
                VcsError::CloneFailed {
                    url: url.to_string(),
                    reason,
                }
            }));
        }
        Self::head_commit(dest)
    }

    fn full_clone(&self, url: &str, dest: &Path) -> Result<()> {
        debug!(url, dest = %dest.display(), "full clone");
        let dest_str = dest.to_string_lossy();
        let output = run_git(&["clone", "--quiet", url, dest_str.as_ref()], None)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_remote_error(&stderr, url, |reason| {
                VcsError::CloneFailed {
                    url: url.to_string(),
                    reason,
                }
            }));
        }
        Ok(())
    }

    fn detach(&self, dir: &Path, commit: &str) -> Result<()> {
        let output = run_git(&["checkout", "--quiet", "--detach", commit], Some(dir))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VcsError::CheckoutFailed {
                reference: commit.to_string(),
                reason: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Run git with the given arguments.
fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<std::process::Output> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    // Never prompt for credentials from an installer.
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd.env("GIT_PROTOCOL", "version=2");

    trace!(?args, "running git");
    cmd.output().map_err(|e| VcsError::Command {
        command: format!("git {}", args.first().copied().unwrap_or_default()),
        message: e.to_string(),
    })
}

/// Parse `ls-remote --tags` output into `(tag, commit)` pairs.
///
/// Annotated tags appear twice, once as the tag object and once peeled
/// (`^{}`); the peeled commit wins.
fn parse_tag_listing(stdout: &str) -> Vec<(String, String)> {
    let mut tags: Vec<(String, String)> = Vec::new();

    for line in stdout.lines() {
        let Some((sha, refname)) = line.split_once('\t') else {
            continue;
        };
        let Some(name) = refname.strip_prefix("refs/tags/") else {
            continue;
        };

        if let Some(name) = name.strip_suffix("^{}") {
            match tags.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = sha.to_string(),
                None => tags.push((name.to_string(), sha.to_string())),
            }
        } else if !tags.iter().any(|(n, _)| n == name) {
            tags.push((name.to_string(), sha.to_string()));
        }
    }

    tags
}

/// Classify git stderr into a typed error.
fn classify_remote_error(
    stderr: &str,
    url: &str,
    fallback: impl FnOnce(String) -> VcsError,
) -> VcsError {
    let lower = stderr.to_lowercase();
    let reason = stderr.trim().to_string();

    if lower.contains("repository not found")
        || lower.contains("does not exist")
        || lower.contains("not found")
    {
        return VcsError::RepositoryNotFound {
            url: url.to_string(),
        };
    }
    if lower.contains("authentication failed")
        || lower.contains("permission denied")
        || lower.contains("access denied")
        || lower.contains("could not read username")
    {
        return VcsError::AuthenticationFailed {
            url: url.to_string(),
            reason,
        };
    }

    fallback(reason)
}
