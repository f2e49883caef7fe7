//! End-to-end git layer tests against local repositories.

use gpk_test_utils::TempGitRepo;
use gpk_vcs::GitClient;

fn tagged_repo() -> TempGitRepo {
    let repo = TempGitRepo::new().unwrap();
    repo.write_file("package.json", "{\"name\": \"fixture\", \"version\": \"1.0.0\"}\n")
        .unwrap();
    repo.commit_all("v1.0.0").unwrap();
    repo.tag("v1.0.0").unwrap();

    repo.write_file("package.json", "{\"name\": \"fixture\", \"version\": \"1.1.0\"}\n")
        .unwrap();
    repo.commit_all("v1.1.0").unwrap();
    repo.tag("v1.1.0").unwrap();
    repo
}

#[test]
fn tags_are_enumerated_in_version_order() {
    let repo = tagged_repo();
    let cache = tempfile::tempdir().unwrap();
    let git = GitClient::new(cache.path());

    let url = repo.path().display().to_string();
    let tags = git.ls_remote_tags(&url).unwrap();

    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["v1.0.0", "v1.1.0"]);
    assert!(tags.iter().all(|t| GitClient::is_commit_hash(&t.commit)));
}

#[test]
fn resolve_ref_handles_branches_and_hashes() {
    let repo = tagged_repo();
    let cache = tempfile::tempdir().unwrap();
    let git = GitClient::new(cache.path());
    let url = repo.path().display().to_string();

    let head = git.resolve_ref(&url, "master").unwrap();
    assert!(GitClient::is_commit_hash(&head));

    // A full hash passes through without touching the remote.
    let pinned = git.resolve_ref(&url, &head).unwrap();
    assert_eq!(pinned, head);

    let missing = git.resolve_ref(&url, "no-such-branch");
    assert!(missing.is_err());
}

#[test]
fn checkout_populates_and_reuses_the_cache() {
    let repo = tagged_repo();
    let cache = tempfile::tempdir().unwrap();
    let git = GitClient::new(cache.path());
    let url = repo.path().display().to_string();

    let tags = git.ls_remote_tags(&url).unwrap();
    let tag = tags.last().unwrap();

    let worktree = git.checkout(&url, &tag.commit, Some(&tag.name)).unwrap();
    assert!(worktree.join("package.json").is_file());
    assert!(git.cache().has_entry(&url, &tag.commit));

    // Second checkout is a cache hit at the same path.
    let again = git.checkout(&url, &tag.commit, Some(&tag.name)).unwrap();
    assert_eq!(worktree, again);
}

#[test]
fn export_produces_an_extractable_tar() {
    let repo = tagged_repo();
    let cache = tempfile::tempdir().unwrap();
    let git = GitClient::new(cache.path());
    let url = repo.path().display().to_string();

    let tags = git.ls_remote_tags(&url).unwrap();
    let tag = tags.first().unwrap();
    let worktree = git.checkout(&url, &tag.commit, Some(&tag.name)).unwrap();

    let out = tempfile::tempdir().unwrap();
    let tar = out.path().join("pkg.tar");
    git.export(&worktree, &tag.commit, &tar).unwrap();
    assert!(tar.is_file());

    let listing = std::process::Command::new("tar")
        .arg("tf")
        .arg(&tar)
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&listing.stdout);
    assert!(stdout.contains("package.json"));
}

#[test]
fn checkout_of_an_older_tag_yields_that_revision() {
    let repo = tagged_repo();
    let cache = tempfile::tempdir().unwrap();
    let git = GitClient::new(cache.path());
    let url = repo.path().display().to_string();

    let tags = git.ls_remote_tags(&url).unwrap();
    let old = tags.first().unwrap();
    assert_eq!(old.name, "v1.0.0");

    let worktree = git.checkout(&url, &old.commit, Some(&old.name)).unwrap();
    let manifest = std::fs::read_to_string(worktree.join("package.json")).unwrap();
    assert!(manifest.contains("\"1.0.0\""));
}
