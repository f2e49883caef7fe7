//! Content-addressed clone cache.
//!
//! Working copies live at `<root>/<digest(url)>/<commit>/`. Keying by both
//! the remote URL and the resolved commit means a cache entry is immutable
//! once populated: re-installing the same revision reuses it without any
//! network traffic, and two remotes that happen to share a tag name never
//! collide.

use crate::error::{Result, VcsError};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Layout of the clone cache on disk.
#[derive(Debug, Clone)]
pub struct CloneCache {
    root: PathBuf,
}

impl CloneCache {
    /// Create a cache rooted at `root`. Nothing is created until
    /// [`CloneCache::entry_dir`] is used by a checkout.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a `(url, commit)` pair.
    #[must_use]
    pub fn entry_dir(&self, url: &str, commit: &str) -> PathBuf {
        self.root.join(Self::url_key(url)).join(commit)
    }

    /// Whether a populated working copy exists for `(url, commit)`.
    #[must_use]
    pub fn has_entry(&self, url: &str, commit: &str) -> bool {
        self.entry_dir(url, commit).join(".git").exists()
    }

    /// Create the parent directory for an entry so a clone can land there.
    ///
    /// # Errors
    /// Returns `Io` on create failure.
    pub fn prepare(&self, url: &str) -> Result<PathBuf> {
        let dir = self.root.join(Self::url_key(url));
        std::fs::create_dir_all(&dir).map_err(|e| VcsError::io(&dir, e))?;
        Ok(dir)
    }

    /// Stable digest key for a remote URL.
    fn url_key(url: &str) -> String {
        let digest = Sha256::digest(url.as_bytes());
        // 16 hex chars is plenty for a local cache directory name.
        let mut key = String::with_capacity(16);
        for byte in &digest[..8] {
            key.push_str(&format!("{byte:02x}"));
        }
        key
    }
}
