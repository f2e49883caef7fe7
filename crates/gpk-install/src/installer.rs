//! Dependency tree installer.
//!
//! The walk is depth-first in manifest-declared order. For each dependency
//! the installer first looks up the requiring package's ancestor chain for
//! an already-materialized copy:
//!
//! - found and it satisfies the constraint: reuse it, never re-fetch;
//! - found but incompatible: fetch and nest inside the requiring package
//!   itself, so the conflicting version cannot poison siblings;
//! - not found: fetch and hoist to the root, where every descendant can
//!   share it.
//!
//! A visited ledger keyed by package directory breaks dependency cycles
//! and makes a second `install` run a pure validation pass.

use crate::environment::Environment;
use crate::package::Package;
use crate::scripts;
use crate::unpack;
use gpk_core::{
    remote_candidates, repo_name_from_url, Error, Manifest, RemoteDescriptor, Result,
    VersionConstraint, MANIFEST_FILE,
};
use gpk_vcs::GitClient;
use semver::Version;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Knobs for an install run.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Skip the root package's dev dependencies.
    pub production: bool,
}

/// A dependency fetched into the clone cache, ready to be placed.
#[derive(Debug)]
struct Fetched {
    worktree: PathBuf,
    commit: String,
    manifest: Manifest,
    version: Option<Version>,
}

/// Drives one install over one root package.
#[derive(Debug)]
pub struct Installer {
    env: Arc<Environment>,
    git: GitClient,
    visited: Vec<PathBuf>,
}

impl Installer {
    /// Create an installer whose clones land in the environment's cache.
    #[must_use]
    pub fn new(env: Arc<Environment>) -> Self {
        let git = GitClient::new(env.cache());
        Self {
            env,
            git,
            visited: Vec::new(),
        }
    }

    /// Materialize the transitive dependency closure of `root`.
    ///
    /// # Errors
    /// Per-dependency failures carry the dependency path from the root.
    pub fn install(&mut self, root: &Arc<Package>, opts: &InstallOptions) -> Result<()> {
        self.env.ensure()?;
        info!(package = %root.name(), dir = %root.dir().display(), "installing");
        self.install_package(root, true, opts)
    }

    /// Install extra dependency sources named on the command line. Each
    /// source must name a remote; the dependency name is derived from the
    /// repository path.
    ///
    /// # Errors
    /// `MalformedSource` for sources without a derivable remote.
    pub fn install_sources(
        &mut self,
        root: &Arc<Package>,
        sources: &[String],
        opts: &InstallOptions,
    ) -> Result<()> {
        self.env.ensure()?;
        // The root's own subtree participates in reuse decisions.
        self.visited.push(root.dir().to_path_buf());

        for src in sources {
            let desc = root.resolve_remote("", src)?;
            let name = desc
                .git
                .as_deref()
                .and_then(repo_name_from_url)
                .ok_or_else(|| Error::MalformedSource {
                    source_str: src.clone(),
                })?;
            self.install_dependency(root, &name, src, opts)
                .map_err(|e| e.with_dependency_path(&format!("{} > {name}", root.dependency_path())))?;
        }
        Ok(())
    }

    /// Process one package's dependencies, in declaration order.
    fn install_package(
        &mut self,
        pkg: &Arc<Package>,
        is_root: bool,
        opts: &InstallOptions,
    ) -> Result<()> {
        if self.visited.iter().any(|dir| dir == pkg.dir()) {
            return Ok(());
        }
        self.visited.push(pkg.dir().to_path_buf());

        let mut deps: Vec<(String, String)> = pkg
            .info()
            .dependencies
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if is_root && !opts.production {
            deps.extend(
                pkg.info()
                    .dev_dependencies
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string())),
            );
        }

        for (name, src) in deps {
            self.install_dependency(pkg, &name, &src, opts)
                .map_err(|e| {
                    e.with_dependency_path(&format!("{} > {name}", pkg.dependency_path()))
                })?;
        }
        Ok(())
    }

    /// Resolve, fetch, and place a single dependency edge.
    fn install_dependency(
        &mut self,
        requirer: &Arc<Package>,
        name: &str,
        src: &str,
        opts: &InstallOptions,
    ) -> Result<()> {
        let desc = requirer.resolve_remote(name, src)?;
        debug!(
            dependency = name,
            git = desc.git.as_deref().unwrap_or("-"),
            version = desc.version.as_deref().unwrap_or("-"),
            branch = desc.branch.as_deref().unwrap_or("-"),
            "resolved dependency source"
        );

        let found = self.find_on_chain(requirer, name)?;
        let requested = desc
            .version
            .clone()
            .or_else(|| desc.branch.clone())
            .unwrap_or_else(|| "HEAD".to_string());

        if let Some(constraint) = desc.constraint() {
            // Version range: the chain lookup happens before any network
            // traffic so a satisfied constraint never re-fetches.
            if let Some(existing) = &found {
                if existing.version().is_some_and(|v| constraint.matches(&v)) {
                    debug!(dependency = name, at = %existing.dir().display(), "reusing");
                    return self.install_package(existing, false, opts);
                }
                let fetched = self.fetch_range(requirer, name, &desc, &constraint)?;
                return self.place(requirer, name, &requested, fetched, opts);
            }

            let fetched = self.fetch_range(requirer, name, &desc, &constraint)?;
            let root = Self::root_of(requirer);
            return self.place(&root, name, &requested, fetched, opts);
        }

        // Pin: branch, tag, commit, or the remote's default branch. The
        // revision must be resolved before the reuse decision because the
        // pinned version is only knowable from the fetched manifest.
        let fetched = self.fetch_pin(&desc)?;
        if let Some(existing) = &found {
            if existing.version() == fetched.version {
                debug!(dependency = name, at = %existing.dir().display(), "reusing pin");
                return self.install_package(existing, false, opts);
            }
            return self.place(requirer, name, &requested, fetched, opts);
        }
        let root = Self::root_of(requirer);
        self.place(&root, name, &requested, fetched, opts)
    }

    /// Walk the ancestor chain looking for a materialized copy of `name`.
    ///
    /// A package whose own name matches counts; that is what terminates
    /// dependency cycles through the root.
    fn find_on_chain(&self, from: &Arc<Package>, name: &str) -> Result<Option<Arc<Package>>> {
        let mut current = Some(Arc::clone(from));
        while let Some(pkg) = current {
            if pkg.name() == name {
                return Ok(Some(pkg));
            }
            let slot = pkg.node_modules().join(name);
            if slot.join(MANIFEST_FILE).is_file() {
                let loaded = Package::from_directory(
                    &slot,
                    false,
                    Arc::clone(&self.env),
                    Some(Arc::clone(&pkg)),
                )?;
                return Ok(Some(Arc::new(loaded)));
            }
            current = pkg.parent().cloned();
        }
        Ok(None)
    }

    /// Topmost ancestor of a package.
    fn root_of(pkg: &Arc<Package>) -> Arc<Package> {
        let mut current = Arc::clone(pkg);
        while let Some(parent) = current.parent().cloned() {
            current = parent;
        }
        current
    }

    /// Fetch the best tag matching a version range.
    ///
    /// When the descriptor has no remote (a bare constraint), each alias
    /// base in the requiring manifest's `remotes` table is tried in
    /// declaration order with the dependency name as the repository path.
    fn fetch_range(
        &mut self,
        requirer: &Arc<Package>,
        name: &str,
        desc: &RemoteDescriptor,
        constraint: &VersionConstraint,
    ) -> Result<Fetched> {
        let candidates = match &desc.git {
            Some(url) => vec![url.clone()],
            None => remote_candidates(&requirer.info().remotes, name),
        };
        let single = candidates.len() == 1;

        let mut available: Vec<String> = Vec::new();
        let mut last_failure: Option<Error> = None;

        for url in candidates {
            let tags = match self.git.ls_remote_tags(&url) {
                Ok(tags) => tags,
                Err(err) => {
                    if single {
                        return Err(err.into());
                    }
                    warn!(%url, %err, "remote unavailable, trying next");
                    last_failure = Some(err.into());
                    continue;
                }
            };

            // Tags are sorted ascending; the first match from the back is
            // the highest satisfying version.
            if let Some(tag) = tags.iter().rev().find(|t| constraint.matches(&t.version)) {
                debug!(%url, tag = %tag.name, "selected tag");
                let worktree = self.git.checkout(&url, &tag.commit, Some(&tag.name))?;
                let manifest = Manifest::load(&worktree)?;
                let version = manifest.parsed_version().or_else(|| Some(tag.version.clone()));
                return Ok(Fetched {
                    worktree,
                    commit: tag.commit.clone(),
                    manifest,
                    version,
                });
            }

            available.extend(tags.iter().map(|t| t.version.to_string()));
        }

        if available.is_empty() {
            if let Some(err) = last_failure {
                return Err(err);
            }
        }
        Err(Error::unsatisfiable(name, constraint.as_str(), available))
    }

    /// Fetch an exact revision: branch, tag, commit hash, or HEAD.
    fn fetch_pin(&mut self, desc: &RemoteDescriptor) -> Result<Fetched> {
        let url = desc.git.as_deref().unwrap_or_default();
        let reference = desc.branch.as_deref().unwrap_or("HEAD");

        let commit = self.git.resolve_ref(url, reference)?;
        let hint = desc
            .branch
            .as_deref()
            .filter(|r| !GitClient::is_commit_hash(r));
        let worktree = self.git.checkout(url, &commit, hint)?;
        let manifest = Manifest::load(&worktree)?;
        let version = manifest.parsed_version();
        Ok(Fetched {
            worktree,
            commit,
            manifest,
            version,
        })
    }

    /// Place a fetched dependency under `parent/node_modules/<name>` and
    /// recurse into it.
    fn place(
        &mut self,
        parent: &Arc<Package>,
        name: &str,
        requested: &str,
        fetched: Fetched,
        opts: &InstallOptions,
    ) -> Result<()> {
        if fetched.manifest.name != name {
            warn!(
                requested = name,
                declared = %fetched.manifest.name,
                "fetched package declares a different name"
            );
        }

        let slot = parent.node_modules().join(name);
        if slot.join(MANIFEST_FILE).is_file() {
            let existing = Arc::new(Package::from_directory(
                &slot,
                false,
                Arc::clone(&self.env),
                Some(Arc::clone(parent)),
            )?);
            if existing.version() == fetched.version {
                // Same revision already in the slot; nothing to do.
                return self.install_package(&existing, false, opts);
            }
            return Err(Error::LayoutConflict {
                name: name.to_string(),
                constraint: requested.to_string(),
                existing: existing
                    .version()
                    .map_or_else(|| "unknown".to_string(), |v| v.to_string()),
                location: slot,
                dependency_path: None,
            });
        }

        self.materialize(&slot, &fetched)?;

        let pkg = Arc::new(Package::from_directory(
            &slot,
            false,
            Arc::clone(&self.env),
            Some(Arc::clone(parent)),
        )?);
        scripts::run_install_hook(&self.env, pkg.dir(), pkg.info())?;
        let version_label = fetched
            .version
            .as_ref()
            .map_or_else(|| "?".to_string(), ToString::to_string);
        info!(
            package = name,
            version = %version_label,
            at = %slot.display(),
            "installed"
        );
        self.install_package(&pkg, false, opts)
    }

    /// Export the fetched commit as a tarball, unpack it in a staging
    /// directory next to the final slot, and move it into place.
    fn materialize(&self, slot: &Path, fetched: &Fetched) -> Result<()> {
        let node_modules = slot
            .parent()
            .ok_or_else(|| Error::io(slot, std::io::Error::other("slot has no parent")))?;
        std::fs::create_dir_all(node_modules).map_err(|e| Error::io(node_modules, e))?;

        // Staging inside node_modules keeps the final rename on one
        // filesystem.
        let staging = tempfile::Builder::new()
            .prefix(".gpk-staging-")
            .tempdir_in(node_modules)
            .map_err(|e| Error::io(node_modules, e))?;

        let tar_path = staging.path().join("package.tar");
        self.git.export(&fetched.worktree, &fetched.commit, &tar_path)?;

        let tree = staging.path().join("tree");
        unpack::unpack(&tar_path, &tree)?;

        // The unpacked tree is what gets installed; it must carry the
        // manifest the recursion will read.
        Manifest::load(&tree)?;

        std::fs::rename(&tree, slot).map_err(|e| Error::io(slot, e))?;
        Ok(())
    }
}
