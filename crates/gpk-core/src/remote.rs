//! Dependency source resolution.
//!
//! A dependency value in a manifest is a single string: either a bare
//! version constraint, or one of several shorthand forms naming a git
//! remote. Resolution turns that string, together with the enclosing
//! manifest's `remotes` alias table, into a normalized [`RemoteDescriptor`].
//!
//! Recognized forms, in precedence order:
//!
//! 1. `git+<transport>://…[#frag]`: strip the `git+` prefix, the remainder
//!    is the literal git URL.
//! 2. `git://…[#frag]`, `http://…`, `https://…`: literal git URL.
//!    Explicit schemes are matched before alias lookup so an alias named
//!    `git` cannot shadow them.
//! 3. `<alias>:<path>[#frag]`: alias resolved against `remotes`.
//! 4. A bare version constraint (`~1.1.7`, `^2.0`, `>=1`, `1.2.3`, `*`).
//!
//! The optional `#` fragment carries either `semver:<range>` (a version
//! constraint) or a raw ref (branch name, `v`-tag, or 40-hex commit), all
//! carried identically in `branch`; the fetcher tells them apart.

use crate::error::{Error, Result};
use crate::manifest::StringMap;
use crate::version::VersionConstraint;
use url::Url;

/// Normalized remote descriptor.
///
/// Invariant: `version` and `branch` are never both `Some`. `git` is `None`
/// only when the source was a pure version constraint, in which case
/// finding a remote is the caller's problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    /// Absolute git URL (or local `.git` path for `file:` aliases).
    pub git: Option<String>,
    /// Semantic-version range expression.
    pub version: Option<String>,
    /// Branch name, tag, or full commit hash.
    pub branch: Option<String>,
}

impl RemoteDescriptor {
    /// Whether this descriptor selects by version range.
    #[must_use]
    pub fn is_versioned(&self) -> bool {
        self.version.is_some()
    }

    /// The version range as a constraint, when present.
    #[must_use]
    pub fn constraint(&self) -> Option<VersionConstraint> {
        self.version.as_deref().map(VersionConstraint::new)
    }
}

/// Resolve a dependency source string into a remote descriptor.
///
/// `name` is the dependency's own name; it supplies the missing path
/// segment for empty-path `file:` aliases. `remotes` is the enclosing
/// manifest's alias table.
///
/// # Errors
/// `UnknownAlias` when an alias prefix is not declared in `remotes`;
/// `MalformedSource` when the string matches no recognized form.
pub fn resolve_remote(remotes: &StringMap, name: &str, src: &str) -> Result<RemoteDescriptor> {
    let src = src.trim();
    let (body, frag) = split_fragment(src);

    // Explicit URL schemes always beat alias lookup.
    if let Some(rest) = body.strip_prefix("git+") {
        Url::parse(rest).map_err(|_| malformed(src))?;
        return with_fragment(Some(rest.to_string()), frag, src);
    }
    if body.starts_with("git://") || body.starts_with("http://") || body.starts_with("https://") {
        Url::parse(body).map_err(|_| malformed(src))?;
        return with_fragment(Some(body.to_string()), frag, src);
    }

    // Alias shorthand.
    if let Some((alias, path)) = split_alias(body) {
        let base = remotes.get(alias).ok_or_else(|| Error::UnknownAlias {
            alias: alias.to_string(),
            source_str: src.to_string(),
        })?;
        return with_fragment(Some(join_alias(base, path, name)), frag, src);
    }

    // Bare version constraint. A constraint never carries a fragment.
    if frag.is_none() && VersionConstraint::is_constraint(body) {
        return Ok(RemoteDescriptor {
            git: None,
            version: Some(body.to_string()),
            branch: None,
        });
    }

    Err(malformed(src))
}

/// Candidate git URLs for a dependency that supplied only a version
/// constraint: every alias base joined with the dependency name, in
/// declaration order. The installer tries them until one has a matching
/// tag.
#[must_use]
pub fn remote_candidates(remotes: &StringMap, name: &str) -> Vec<String> {
    remotes
        .iter()
        .map(|(_, base)| join_alias(base, "", name))
        .collect()
}

/// Derive a dependency name from a git URL: the last path segment with any
/// `.git` suffix removed. Handles the local bare form `<path>/repo/.git`.
#[must_use]
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/.git").unwrap_or(trimmed);
    let last = trimmed.rsplit(['/', ':']).next()?;
    let last = last.strip_suffix(".git").unwrap_or(last);
    if last.is_empty() {
        None
    } else {
        Some(last.to_string())
    }
}

fn malformed(src: &str) -> Error {
    Error::MalformedSource {
        source_str: src.to_string(),
    }
}

/// Split off the optional `#` fragment. An empty fragment counts as none.
fn split_fragment(src: &str) -> (&str, Option<&str>) {
    match src.split_once('#') {
        Some((body, frag)) if !frag.is_empty() => (body, Some(frag)),
        Some((body, _)) => (body, None),
        None => (src, None),
    }
}

/// Split `<alias>:<path>` when the prefix is a plausible alias token.
fn split_alias(body: &str) -> Option<(&str, &str)> {
    let (alias, path) = body.split_once(':')?;
    if alias.is_empty()
        || !alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return None;
    }
    Some((alias, path))
}

/// Combine an alias base URL with the path portion of the shorthand.
fn join_alias(base: &str, path: &str, name: &str) -> String {
    let path = path.trim_matches('/');

    // An empty path means the dependency's own name supplies the repo
    // name. Preserved for compatibility with manifests that write
    // `local:#semver:…`.
    let seg = if path.is_empty() { name } else { path };

    if let Some(dir) = base.strip_prefix("file:") {
        // Local alias: the source is a bare clone directory on disk.
        let dir = dir.trim_end_matches('/');
        return format!("{dir}/{seg}/.git");
    }

    let base = base.trim_end_matches('/');
    if seg.ends_with(".git") {
        format!("{base}/{seg}")
    } else {
        format!("{base}/{seg}.git")
    }
}

/// Apply fragment interpretation to a resolved git URL.
fn with_fragment(git: Option<String>, frag: Option<&str>, src: &str) -> Result<RemoteDescriptor> {
    let (version, branch) = match frag {
        None => (None, None),
        Some(f) => match f.strip_prefix("semver:") {
            Some(range) if !range.is_empty() => (Some(range.to_string()), None),
            Some(_) => return Err(malformed(src)),
            None => (None, Some(f.to_string())),
        },
    };
    Ok(RemoteDescriptor {
        git,
        version,
        branch,
    })
}
