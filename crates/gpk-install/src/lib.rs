//! Package model, environment, and the dependency tree installer.
//!
//! The pieces fit together like this: a [`Package`] is a manifest
//! materialized at a directory, sharing one [`Environment`] per
//! invocation. [`Package::install`] hands the package to the
//! [`Installer`], which walks the dependency graph depth-first in
//! manifest-declared order, fetching each dependency through the git
//! layer and laying it out under `node_modules/` with the
//! nested-with-hoist-when-safe rule.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod environment;
mod installer;
mod package;
mod scripts;
mod unpack;

pub use environment::Environment;
pub use installer::{InstallOptions, Installer};
pub use package::Package;
pub use scripts::run_script;
