//! Error types for gpk operations.
//!
//! One central enum with a variant per failure kind. The installer attaches
//! the dependency path (`a > c > d`) to per-dependency failures before
//! re-raising, so the user sees which edge of the tree broke.

use std::path::PathBuf;
use thiserror::Error;

/// Failure kinds, independent of the variant payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Alias prefix not present in the manifest's `remotes` table.
    UnknownAlias,
    /// Dependency source string matches no recognized form.
    MalformedSource,
    /// No `package.json` found.
    NoManifest,
    /// `package.json` exists but does not validate.
    ManifestInvalid,
    /// Git transport failure (clone, ls-remote, checkout).
    FetchFailed,
    /// No tag on the remote matches the version range.
    ConstraintUnsatisfiable,
    /// Sibling dependencies need incompatible versions that cannot be
    /// separated by nesting.
    LayoutConflict,
    /// Named script absent from the manifest.
    NoSuchScript,
    /// `init` in a directory that already has a manifest.
    AlreadyInitialized,
    /// Filesystem failure. Always fatal.
    Io,
}

/// Main error type for gpk.
#[derive(Error, Debug)]
pub enum Error {
    /// Alias shorthand used an alias the manifest does not declare.
    #[error("unknown remote alias '{alias}' in '{source_str}'")]
    UnknownAlias {
        /// The alias prefix.
        alias: String,
        /// The full dependency source string.
        source_str: String,
    },

    /// The source string matched no recognized form.
    #[error("malformed dependency source '{source_str}'")]
    MalformedSource {
        /// The offending source string.
        source_str: String,
    },

    /// No manifest at (or above) the given directory.
    #[error("no package.json found in {}", .dir.display())]
    NoManifest {
        /// Directory the search started from or was pinned to.
        dir: PathBuf,
    },

    /// Manifest exists but failed to parse or validate.
    #[error("invalid manifest at {}: {message}", .path.display())]
    ManifestInvalid {
        /// Path to the manifest file.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// Git transport failure.
    #[error("fetch failed for {url}: {reason}{}", .dependency_path.as_deref().map(|p| format!(" (via {p})")).unwrap_or_default())]
    FetchFailed {
        /// Remote URL.
        url: String,
        /// Failure reason, usually parsed from git stderr.
        reason: String,
        /// Dependency path from the root, when raised mid-install.
        dependency_path: Option<String>,
    },

    /// No tag on any candidate remote satisfies the range.
    #[error("no version of '{name}' satisfies '{constraint}'{}", .dependency_path.as_deref().map(|p| format!(" (via {p})")).unwrap_or_default())]
    ConstraintUnsatisfiable {
        /// Dependency name.
        name: String,
        /// The range that could not be satisfied.
        constraint: String,
        /// Versions that were available, for the error message.
        available: Vec<String>,
        /// Dependency path from the root, when raised mid-install.
        dependency_path: Option<String>,
    },

    /// Conflicting versions that nesting cannot separate.
    #[error("layout conflict for '{name}': required '{constraint}' but '{existing}' is pinned at {}{}", .location.display(), .dependency_path.as_deref().map(|p| format!(" (via {p})")).unwrap_or_default())]
    LayoutConflict {
        /// Dependency name.
        name: String,
        /// Required constraint.
        constraint: String,
        /// Version already materialized.
        existing: String,
        /// Where the existing copy lives.
        location: PathBuf,
        /// Dependency path from the root, when raised mid-install.
        dependency_path: Option<String>,
    },

    /// Script name not present in the manifest.
    #[error("no such script: '{name}'")]
    NoSuchScript {
        /// Requested script name.
        name: String,
    },

    /// `init` refused to clobber an existing manifest.
    #[error("already initialized: {} exists", .path.display())]
    AlreadyInitialized {
        /// Path of the existing manifest.
        path: PathBuf,
    },

    /// Filesystem failure.
    #[error("io error at {}: {source}", .path.display())]
    Io {
        /// Path the operation touched.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Get the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownAlias { .. } => ErrorKind::UnknownAlias,
            Self::MalformedSource { .. } => ErrorKind::MalformedSource,
            Self::NoManifest { .. } => ErrorKind::NoManifest,
            Self::ManifestInvalid { .. } => ErrorKind::ManifestInvalid,
            Self::FetchFailed { .. } => ErrorKind::FetchFailed,
            Self::ConstraintUnsatisfiable { .. } => ErrorKind::ConstraintUnsatisfiable,
            Self::LayoutConflict { .. } => ErrorKind::LayoutConflict,
            Self::NoSuchScript { .. } => ErrorKind::NoSuchScript,
            Self::AlreadyInitialized { .. } => ErrorKind::AlreadyInitialized,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Create an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid-manifest error.
    #[must_use]
    pub fn manifest_invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ManifestInvalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a fetch-failed error.
    #[must_use]
    pub fn fetch_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            reason: reason.into(),
            dependency_path: None,
        }
    }

    /// Create a constraint-unsatisfiable error.
    #[must_use]
    pub fn unsatisfiable(
        name: impl Into<String>,
        constraint: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        Self::ConstraintUnsatisfiable {
            name: name.into(),
            constraint: constraint.into(),
            available,
            dependency_path: None,
        }
    }

    /// Attach the dependency path to per-dependency failures.
    ///
    /// Only `FetchFailed`, `ConstraintUnsatisfiable`, and `LayoutConflict`
    /// carry a path; other kinds pass through unchanged.
    #[must_use]
    pub fn with_dependency_path(mut self, path: &str) -> Self {
        match &mut self {
            Self::FetchFailed {
                dependency_path, ..
            }
            | Self::ConstraintUnsatisfiable {
                dependency_path, ..
            }
            | Self::LayoutConflict {
                dependency_path, ..
            } => {
                if dependency_path.is_none() {
                    *dependency_path = Some(path.to_string());
                }
            }
            _ => {}
        }
        self
    }
}

/// Result type for gpk operations.
pub type Result<T> = std::result::Result<T, Error>;
