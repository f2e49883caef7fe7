//! A package materialized on disk.

use crate::environment::Environment;
use crate::installer::{InstallOptions, Installer};
use crate::scripts;
use gpk_core::{resolve_remote, Error, Manifest, RemoteDescriptor, Result, MANIFEST_FILE};
use semver::Version;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One resolved package on disk.
///
/// Packages form a tree through `parent`: the parent is the package whose
/// `node_modules` physically contains this one, which is also the next hop
/// of the ancestor chain the installer walks for reuse decisions.
#[derive(Debug)]
pub struct Package {
    dir: PathBuf,
    info: Manifest,
    env: Arc<Environment>,
    parent: Option<Arc<Package>>,
}

impl Package {
    /// Load the package at (or above) `dir`.
    ///
    /// With `walk` set, ascends from `dir` until a `package.json` is found;
    /// otherwise the manifest must be at `dir` exactly.
    ///
    /// # Errors
    /// `NoManifest` when discovery fails; `ManifestInvalid` when the
    /// manifest does not validate.
    pub fn from_directory(
        dir: &Path,
        walk: bool,
        env: Arc<Environment>,
        parent: Option<Arc<Package>>,
    ) -> Result<Self> {
        let dir = if walk {
            Manifest::find_root(dir)?
        } else {
            dir.to_path_buf()
        };
        let info = Manifest::load(&dir)?;
        debug!(package = %info.name, dir = %dir.display(), "loaded package");
        Ok(Self {
            dir,
            info,
            env,
            parent,
        })
    }

    /// Package root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Parsed manifest.
    #[must_use]
    pub fn info(&self) -> &Manifest {
        &self.info
    }

    /// Shared environment.
    #[must_use]
    pub fn env(&self) -> &Arc<Environment> {
        &self.env
    }

    /// Physical parent package, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Package>> {
        self.parent.as_ref()
    }

    /// Package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Parsed package version, when the manifest has one.
    #[must_use]
    pub fn version(&self) -> Option<Version> {
        self.info.parsed_version()
    }

    /// This package's dependency directory.
    #[must_use]
    pub fn node_modules(&self) -> PathBuf {
        self.dir.join("node_modules")
    }

    /// Names from the root package down to this one, for error context.
    #[must_use]
    pub fn dependency_path(&self) -> String {
        let mut names = vec![self.name().to_string()];
        let mut current = self.parent.clone();
        while let Some(pkg) = current {
            names.push(pkg.name().to_string());
            current = pkg.parent.clone();
        }
        names.reverse();
        names.join(" > ")
    }

    /// Resolve a dependency source string against this package's alias
    /// table. Pure.
    ///
    /// # Errors
    /// `UnknownAlias` or `MalformedSource` per the resolution grammar.
    pub fn resolve_remote(&self, name: &str, src: &str) -> Result<RemoteDescriptor> {
        resolve_remote(&self.info.remotes, name, src)
    }

    /// Install this package's dependency tree.
    ///
    /// # Errors
    /// Propagates fetch, constraint, and layout failures with the
    /// dependency path attached.
    pub fn install(self: &Arc<Self>, opts: &InstallOptions) -> Result<()> {
        Installer::new(Arc::clone(&self.env)).install(self, opts)
    }

    /// Install additional dependency sources given on the command line,
    /// without touching the manifest.
    ///
    /// # Errors
    /// `MalformedSource` for sources that do not name a remote.
    pub fn install_sources(self: &Arc<Self>, sources: &[String], opts: &InstallOptions) -> Result<()> {
        Installer::new(Arc::clone(&self.env)).install_sources(self, sources, opts)
    }

    /// Remove named dependency subtrees from `node_modules`.
    ///
    /// Returns how many were removed; names with no installed copy warn.
    ///
    /// # Errors
    /// Returns `Io` on removal failure.
    pub fn uninstall(&self, names: &[String]) -> Result<usize> {
        let mut removed = 0;
        for name in names {
            let dir = self.node_modules().join(name);
            if dir.is_dir() {
                std::fs::remove_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
                info!(package = %name, "uninstalled");
                removed += 1;
            } else {
                warn!(package = %name, "not installed");
            }
        }
        Ok(removed)
    }

    /// Re-run the post-install script for every materialized dependency,
    /// deepest first, without re-fetching anything.
    ///
    /// # Errors
    /// Returns `Io` on filesystem failure; invalid nested manifests abort.
    pub fn rebuild(&self) -> Result<()> {
        let node_modules = self.node_modules();
        if !node_modules.is_dir() {
            return Ok(());
        }

        // Contents-first traversal rebuilds leaves before the packages
        // that depend on them.
        for entry in walkdir::WalkDir::new(&node_modules)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if !entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            let under_node_modules = path
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|name| name == "node_modules");
            if !under_node_modules || !path.join(MANIFEST_FILE).is_file() {
                continue;
            }

            let manifest = Manifest::load(path)?;
            debug!(package = %manifest.name, "rebuilding");
            scripts::run_install_hook(&self.env, path, &manifest)?;
        }
        Ok(())
    }

    /// Run a manifest script with extra arguments.
    ///
    /// Returns the script's exit code.
    ///
    /// # Errors
    /// `NoSuchScript` when the script is absent.
    pub fn run(&self, script: &str, args: &[String]) -> Result<i32> {
        scripts::run_script(&self.env, &self.dir, &self.info, script, args)
    }

    /// Synthesize a minimal manifest in `dir`, named after the directory.
    ///
    /// # Errors
    /// `AlreadyInitialized` when a manifest exists there.
    pub fn init(dir: &Path) -> Result<()> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            return Err(Error::AlreadyInitialized {
                path: manifest_path,
            });
        }

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "package".to_string());

        Manifest::skeleton(&name).save(dir)?;
        info!(package = %name, dir = %dir.display(), "initialized");
        Ok(())
    }
}
