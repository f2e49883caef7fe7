//! Installer integration tests against local git repositories.
//!
//! Every remote is a `file:` alias pointing at a temp directory of real
//! git repositories, so the full fetch/export/unpack/place pipeline runs
//! without network access.

use gpk_install::{Environment, InstallOptions, Package};
use gpk_test_utils::{package_json, RepoFarm, TempProject};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    farm: RepoFarm,
    _home: TempDir,
    env: Arc<Environment>,
}

impl Harness {
    fn new() -> Self {
        let farm = RepoFarm::new().unwrap();
        let home = tempfile::tempdir().unwrap();
        let env = Arc::new(Environment::with_home(home.path().join("gpk")));
        Self {
            farm,
            _home: home,
            env,
        }
    }

    /// Build a manifest whose remotes table carries the farm alias.
    fn manifest(&self, name: &str, version: &str, deps: &[(&str, &str)]) -> serde_json::Value {
        let base = self.farm.alias_base();
        let remotes: Vec<(&str, &str)> = vec![("local", base.as_str())];
        package_json(name, version, &remotes, deps)
    }

    fn root_package(&self, project: &TempProject) -> Arc<Package> {
        Arc::new(
            Package::from_directory(project.path(), false, Arc::clone(&self.env), None).unwrap(),
        )
    }
}

fn installed_version(dir: &Path) -> String {
    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("package.json")).unwrap()).unwrap();
    manifest["version"].as_str().unwrap().to_string()
}

/// Recursive listing of a tree, for idempotence comparison.
fn tree_listing(root: &Path) -> Vec<String> {
    let mut paths: Vec<String> = walk(root)
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().display().to_string())
        .collect();
    paths.sort();
    paths
}

fn walk(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            out.push(path.clone());
            if path.is_dir() {
                out.extend(walk(&path));
            }
        }
    }
    out
}

#[test]
fn installs_dependency_by_semver_range() {
    let h = Harness::new();
    h.farm
        .create_package("bdb", "1.1.5", &h.manifest("bdb", "1.1.5", &[]))
        .unwrap();
    h.farm
        .add_version("bdb", "1.1.7", &h.manifest("bdb", "1.1.7", &[]))
        .unwrap();
    h.farm
        .add_version("bdb", "2.0.0", &h.manifest("bdb", "2.0.0", &[]))
        .unwrap();

    let project = TempProject::new(&h.manifest(
        "app",
        "1.0.0",
        &[("bdb", "local:bdb#semver:~1.1.5")],
    ))
    .unwrap();

    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();

    let installed = project.path().join("node_modules").join("bdb");
    assert!(installed.join("package.json").is_file());
    // Highest tag matching the range, not the newest overall.
    assert_eq!(installed_version(&installed), "1.1.7");
}

#[test]
fn unflat_layout_nests_only_the_conflicting_copy() {
    let h = Harness::new();

    // f has two incompatible majors.
    h.farm
        .create_package("f", "1.0.0", &h.manifest("f", "1.0.0", &[]))
        .unwrap();
    h.farm
        .add_version("f", "2.0.0", &h.manifest("f", "2.0.0", &[]))
        .unwrap();

    // d and e both want f@2; c itself wants f@1.
    h.farm
        .create_package(
            "d",
            "1.0.0",
            &h.manifest("d", "1.0.0", &[("f", "local:f#semver:~2.0.0")]),
        )
        .unwrap();
    h.farm
        .create_package(
            "e",
            "1.0.0",
            &h.manifest("e", "1.0.0", &[("f", "local:f#semver:~2.0.0")]),
        )
        .unwrap();
    h.farm
        .create_package(
            "c",
            "1.0.0",
            &h.manifest(
                "c",
                "1.0.0",
                &[
                    ("d", "local:d#semver:^1.0.0"),
                    ("e", "local:e#semver:^1.0.0"),
                    ("f", "local:f#semver:~1.0.0"),
                ],
            ),
        )
        .unwrap();

    let project =
        TempProject::new(&h.manifest("a", "1.0.0", &[("c", "local:c#semver:^1.0.0")])).unwrap();
    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();

    let nm = project.path().join("node_modules");

    // The copy compatible with c's constraint is nested at c.
    let c_f = nm.join("c").join("node_modules").join("f");
    assert!(c_f.join("package.json").is_file());
    assert_eq!(installed_version(&c_f), "1.0.0");

    // d and e share the hoisted f@2; neither grows its own nested copy.
    assert!(!nm.join("d").join("node_modules").join("f").exists());
    assert!(!nm.join("e").join("node_modules").join("f").exists());
    assert_eq!(installed_version(&nm.join("f")), "2.0.0");
}

#[test]
fn second_install_changes_nothing() {
    let h = Harness::new();
    h.farm
        .create_package("f", "1.0.0", &h.manifest("f", "1.0.0", &[]))
        .unwrap();
    h.farm
        .create_package(
            "c",
            "1.0.0",
            &h.manifest("c", "1.0.0", &[("f", "local:f#semver:^1.0.0")]),
        )
        .unwrap();

    let project =
        TempProject::new(&h.manifest("a", "1.0.0", &[("c", "local:c#semver:^1.0.0")])).unwrap();

    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();
    let before = tree_listing(project.path());

    // A fresh Package mirrors a fresh invocation.
    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();
    let after = tree_listing(project.path());

    assert_eq!(before, after);
}

#[test]
fn ancestor_satisfying_copy_is_reused() {
    let h = Harness::new();
    h.farm
        .create_package("bdb", "1.1.7", &h.manifest("bdb", "1.1.7", &[]))
        .unwrap();
    h.farm
        .create_package(
            "c",
            "1.0.0",
            &h.manifest("c", "1.0.0", &[("bdb", "local:bdb#semver:~1.1.0")]),
        )
        .unwrap();

    let project = TempProject::new(&h.manifest(
        "a",
        "1.0.0",
        &[
            ("bdb", "local:bdb#semver:~1.1.0"),
            ("c", "local:c#semver:^1.0.0"),
        ],
    ))
    .unwrap();

    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();

    let nm = project.path().join("node_modules");
    assert!(nm.join("bdb").is_dir());
    // c inherits the root's copy.
    assert!(!nm.join("c").join("node_modules").join("bdb").exists());
}

#[test]
fn declaration_order_decides_the_hoist_slot() {
    let h = Harness::new();
    h.farm
        .create_package("f", "1.0.0", &h.manifest("f", "1.0.0", &[]))
        .unwrap();
    h.farm
        .add_version("f", "2.0.0", &h.manifest("f", "2.0.0", &[]))
        .unwrap();
    h.farm
        .create_package(
            "c",
            "1.0.0",
            &h.manifest("c", "1.0.0", &[("f", "local:f#semver:~2.0.0")]),
        )
        .unwrap();

    // The root declares its own f first, so it wins the root slot and c's
    // incompatible f nests under c.
    let project = TempProject::new(&h.manifest(
        "a",
        "1.0.0",
        &[
            ("f", "local:f#semver:~1.0.0"),
            ("c", "local:c#semver:^1.0.0"),
        ],
    ))
    .unwrap();

    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();

    let nm = project.path().join("node_modules");
    assert_eq!(installed_version(&nm.join("f")), "1.0.0");
    assert_eq!(
        installed_version(&nm.join("c").join("node_modules").join("f")),
        "2.0.0"
    );
}

#[test]
fn hoisted_subtree_blocking_a_direct_dependency_is_a_layout_conflict() {
    let h = Harness::new();
    h.farm
        .create_package("f", "1.0.0", &h.manifest("f", "1.0.0", &[]))
        .unwrap();
    h.farm
        .add_version("f", "2.0.0", &h.manifest("f", "2.0.0", &[]))
        .unwrap();
    h.farm
        .create_package(
            "c",
            "1.0.0",
            &h.manifest("c", "1.0.0", &[("f", "local:f#semver:~2.0.0")]),
        )
        .unwrap();

    // c comes first, its subtree hoists f@2 into the root slot, and the
    // root's own f@1 can no longer be placed: its nest target is the
    // occupied root slot itself.
    let project = TempProject::new(&h.manifest(
        "a",
        "1.0.0",
        &[
            ("c", "local:c#semver:^1.0.0"),
            ("f", "local:f#semver:~1.0.0"),
        ],
    ))
    .unwrap();

    let root = h.root_package(&project);
    let err = root.install(&InstallOptions::default()).unwrap_err();
    assert_eq!(err.kind(), gpk_core::ErrorKind::LayoutConflict);
    assert!(err.to_string().contains("a > f"));
}

#[test]
fn bare_constraint_falls_back_to_declared_remotes() {
    let h = Harness::new();
    h.farm
        .create_package("bdb", "1.1.7", &h.manifest("bdb", "1.1.7", &[]))
        .unwrap();

    let project = TempProject::new(&h.manifest("a", "1.0.0", &[("bdb", "~1.1.0")])).unwrap();
    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();

    assert_eq!(
        installed_version(&project.path().join("node_modules").join("bdb")),
        "1.1.7"
    );
}

#[test]
fn branch_pin_installs_head_of_branch() {
    let h = Harness::new();
    h.farm
        .create_package("bdb", "1.1.7", &h.manifest("bdb", "1.1.7", &[]))
        .unwrap();
    h.farm
        .add_version("bdb", "1.2.0", &h.manifest("bdb", "1.2.0", &[]))
        .unwrap();

    let project =
        TempProject::new(&h.manifest("a", "1.0.0", &[("bdb", "local:bdb#master")])).unwrap();
    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();

    // HEAD of master is the newest commit.
    assert_eq!(
        installed_version(&project.path().join("node_modules").join("bdb")),
        "1.2.0"
    );
}

#[test]
fn unsatisfiable_range_carries_the_dependency_path() {
    let h = Harness::new();
    h.farm
        .create_package("bdb", "1.1.7", &h.manifest("bdb", "1.1.7", &[]))
        .unwrap();

    let project = TempProject::new(&h.manifest(
        "a",
        "1.0.0",
        &[("bdb", "local:bdb#semver:~9.9.9")],
    ))
    .unwrap();

    let root = h.root_package(&project);
    let err = root.install(&InstallOptions::default()).unwrap_err();
    assert_eq!(err.kind(), gpk_core::ErrorKind::ConstraintUnsatisfiable);
    assert!(err.to_string().contains("a > bdb"), "{err}");
}

#[test]
fn dependency_cycles_terminate() {
    let h = Harness::new();
    h.farm
        .create_package(
            "x",
            "1.0.0",
            &h.manifest("x", "1.0.0", &[("y", "local:y#semver:^1.0.0")]),
        )
        .unwrap();
    h.farm
        .create_package(
            "y",
            "1.0.0",
            &h.manifest("y", "1.0.0", &[("x", "local:x#semver:^1.0.0")]),
        )
        .unwrap();

    let project =
        TempProject::new(&h.manifest("a", "1.0.0", &[("x", "local:x#semver:^1.0.0")])).unwrap();
    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();

    let nm = project.path().join("node_modules");
    assert!(nm.join("x").is_dir());
    assert!(nm.join("y").is_dir());
    // The cycle resolves by reuse, not duplication.
    assert!(!nm.join("x").join("node_modules").join("y").exists());
    assert!(!nm.join("y").join("node_modules").join("x").exists());
}

#[test]
fn dev_dependencies_install_for_root_only_unless_production() {
    let h = Harness::new();
    h.farm
        .create_package("lint", "1.0.0", &h.manifest("lint", "1.0.0", &[]))
        .unwrap();
    h.farm
        .create_package("bdb", "1.0.0", &h.manifest("bdb", "1.0.0", &[]))
        .unwrap();

    let mut manifest = h.manifest("a", "1.0.0", &[("bdb", "local:bdb#semver:^1.0.0")]);
    manifest["devDependencies"] =
        serde_json::json!({ "lint": "local:lint#semver:^1.0.0" });

    let project = TempProject::new(&manifest).unwrap();
    let root = h.root_package(&project);
    root.install(&InstallOptions { production: true }).unwrap();

    let nm = project.path().join("node_modules");
    assert!(nm.join("bdb").is_dir());
    assert!(!nm.join("lint").exists());

    // A dev install brings it in.
    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();
    assert!(nm.join("lint").is_dir());
}

#[test]
#[cfg(unix)]
fn install_hook_runs_in_the_placed_package() {
    let h = Harness::new();
    let mut manifest = h.manifest("hooked", "1.0.0", &[]);
    manifest["scripts"] = serde_json::json!({ "install": "touch hooked.marker" });
    h.farm.create_package("hooked", "1.0.0", &manifest).unwrap();

    let project = TempProject::new(&h.manifest(
        "a",
        "1.0.0",
        &[("hooked", "local:hooked#semver:^1.0.0")],
    ))
    .unwrap();
    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();

    assert!(project
        .path()
        .join("node_modules")
        .join("hooked")
        .join("hooked.marker")
        .is_file());
}

#[test]
fn fetched_tree_without_manifest_is_rejected() {
    use gpk_test_utils::TempGitRepo;

    let h = Harness::new();
    let repo = TempGitRepo::new().unwrap();
    repo.write_file("README", "not a package\n").unwrap();
    repo.commit_all("initial").unwrap();
    repo.tag("v1.0.0").unwrap();

    let src = format!("git+file://{}#semver:~1.0.0", repo.path().display());
    let project = TempProject::new(&h.manifest("a", "1.0.0", &[("naked", &src)])).unwrap();

    let root = h.root_package(&project);
    let err = root.install(&InstallOptions::default()).unwrap_err();
    assert_eq!(err.kind(), gpk_core::ErrorKind::NoManifest);
}

#[test]
fn uninstall_then_reinstall_heals_the_tree() {
    let h = Harness::new();
    h.farm
        .create_package("bdb", "1.0.0", &h.manifest("bdb", "1.0.0", &[]))
        .unwrap();

    let project = TempProject::new(&h.manifest(
        "a",
        "1.0.0",
        &[("bdb", "local:bdb#semver:^1.0.0")],
    ))
    .unwrap();
    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();

    root.uninstall(&["bdb".to_string()]).unwrap();
    assert!(!project.path().join("node_modules").join("bdb").exists());

    let root = h.root_package(&project);
    root.install(&InstallOptions::default()).unwrap();
    assert!(project.path().join("node_modules").join("bdb").is_dir());
}
