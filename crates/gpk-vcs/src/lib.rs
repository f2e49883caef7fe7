//! Git subprocess orchestration for gpk.
//!
//! Everything goes through the `git` CLI: `ls-remote` for tag and ref
//! enumeration, `clone`/`checkout` into a content-addressed cache, and
//! `archive` for exporting a commit as a tarball. There is no in-process
//! git implementation; the CLI is the most reliable transport across
//! HTTPS, SSH, the git protocol, and local bare directories.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod cache;
mod error;
mod git;

pub use cache::CloneCache;
pub use error::{Result, VcsError};
pub use git::{GitClient, RemoteTag};
