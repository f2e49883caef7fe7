//! Core types for the gpk git-native package manager.
//!
//! This crate provides the foundational pieces shared by the rest of the
//! workspace:
//! - Manifest model and on-disk store (`package.json`)
//! - Version constraints and matching
//! - Dependency source resolution into remote descriptors
//! - Error types

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
mod manifest;
mod remote;
mod version;

pub use error::{Error, ErrorKind, Result};
pub use manifest::{Manifest, StringMap, MANIFEST_FILE};
pub use remote::{remote_candidates, repo_name_from_url, resolve_remote, RemoteDescriptor};
pub use version::VersionConstraint;

// Re-export commonly used types
pub use semver::Version;
