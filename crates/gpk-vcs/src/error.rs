//! VCS error types.

use std::path::PathBuf;
use thiserror::Error;

/// Git-layer errors with enough context to classify the failure.
#[derive(Error, Debug)]
pub enum VcsError {
    /// The `git` binary could not be spawned or waited on.
    #[error("failed to run {command}: {message}")]
    Command {
        /// The git subcommand.
        command: String,
        /// Spawn/wait failure.
        message: String,
    },

    /// Remote does not exist.
    #[error("repository not found: {url}")]
    RepositoryNotFound {
        /// Remote URL.
        url: String,
    },

    /// Authentication rejected by the remote.
    #[error("authentication failed for {url}: {reason}")]
    AuthenticationFailed {
        /// Remote URL.
        url: String,
        /// Stderr excerpt.
        reason: String,
    },

    /// Clone failed for some other reason.
    #[error("clone failed for {url}: {reason}")]
    CloneFailed {
        /// Remote URL.
        url: String,
        /// Stderr excerpt.
        reason: String,
    },

    /// `ls-remote` failed.
    #[error("ls-remote failed for {url}: {reason}")]
    LsRemoteFailed {
        /// Remote URL.
        url: String,
        /// Stderr excerpt.
        reason: String,
    },

    /// The requested ref does not exist on the remote.
    #[error("reference '{reference}' not found on {url}")]
    ReferenceNotFound {
        /// Requested branch, tag, or commit.
        reference: String,
        /// Remote URL.
        url: String,
    },

    /// Checkout of a resolved commit failed.
    #[error("checkout of {reference} failed: {reason}")]
    CheckoutFailed {
        /// Commit or ref being checked out.
        reference: String,
        /// Stderr excerpt.
        reason: String,
    },

    /// `git archive` export failed.
    #[error("archive export of {commit} failed: {reason}")]
    ArchiveFailed {
        /// Commit being exported.
        commit: String,
        /// Stderr excerpt.
        reason: String,
    },

    /// Filesystem failure in the cache.
    #[error("io error at {}: {source}", .path.display())]
    Io {
        /// Path the operation touched.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl VcsError {
    /// IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The remote URL involved, when the failure has one.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::RepositoryNotFound { url }
            | Self::AuthenticationFailed { url, .. }
            | Self::CloneFailed { url, .. }
            | Self::LsRemoteFailed { url, .. }
            | Self::ReferenceNotFound { url, .. } => Some(url),
            _ => None,
        }
    }
}

impl From<VcsError> for gpk_core::Error {
    fn from(err: VcsError) -> Self {
        match err {
            VcsError::Io { path, source } => Self::io(path, source),
            other => {
                let url = other.url().unwrap_or("<local>").to_string();
                Self::fetch_failed(url, other.to_string())
            }
        }
    }
}

/// Result type for VCS operations.
pub type Result<T> = std::result::Result<T, VcsError>;
