//! Package manifest model and on-disk store.
//!
//! A package is described by a UTF-8 JSON `package.json` at its root.
//! Only `name` is required; everything else is optional. Unknown top-level
//! keys are tolerated with a warning so newer manifests keep loading on
//! older clients.
//!
//! `remotes` and `dependencies` preserve declaration order: the installer's
//! hoist decisions and remote fallback iteration both depend on it.

use crate::error::{Error, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Manifest file name.
pub const MANIFEST_FILE: &str = "package.json";

/// Insertion-ordered string-to-string map.
///
/// JSON objects in a manifest are small (a handful of dependencies or
/// aliases), so lookup is a linear scan over a `Vec` and iteration is
/// document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringMap {
    entries: Vec<(String, String)>,
}

impl StringMap {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check for a key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert a pair, replacing any existing value for the key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Iterate pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StringMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for StringMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StringMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct StringMapVisitor;

        impl<'de> Visitor<'de> for StringMapVisitor {
            type Value = StringMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of strings to strings")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut map = StringMap::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(StringMapVisitor)
    }
}

/// Parsed contents of a `package.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Package name. The only required field.
    pub name: String,

    /// Package version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Entry point, relative to the package root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    /// Remote alias table: short scheme name to base URL.
    #[serde(default, skip_serializing_if = "StringMap::is_empty")]
    pub remotes: StringMap,

    /// Dependencies: name to source string, in declaration order.
    #[serde(default, skip_serializing_if = "StringMap::is_empty")]
    pub dependencies: StringMap,

    /// Development dependencies, installed for the root package only.
    #[serde(
        default,
        rename = "devDependencies",
        skip_serializing_if = "StringMap::is_empty"
    )]
    pub dev_dependencies: StringMap,

    /// Scripts: name to shell command string.
    #[serde(default, skip_serializing_if = "StringMap::is_empty")]
    pub scripts: StringMap,

    /// Unrecognized top-level keys, kept for round-tripping.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    /// Create a minimal manifest, as written by `init`.
    #[must_use]
    pub fn skeleton(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some("0.0.0".to_string()),
            main: None,
            remotes: StringMap::new(),
            dependencies: StringMap::new(),
            dev_dependencies: StringMap::new(),
            scripts: StringMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Load and validate the manifest inside `dir`.
    ///
    /// # Errors
    /// `NoManifest` if `dir` has no `package.json`; `ManifestInvalid` if it
    /// fails to parse or validate.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NoManifest {
                    dir: dir.to_path_buf(),
                });
            }
            Err(e) => return Err(Error::io(&path, e)),
        };

        let manifest: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::manifest_invalid(&path, e.to_string()))?;
        manifest.validate(&path)?;
        Ok(manifest)
    }

    /// Write the manifest to `dir/package.json`, pretty-printed.
    ///
    /// # Errors
    /// Returns `Io` on write failure.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::manifest_invalid(&path, e.to_string()))?;
        json.push('\n');
        std::fs::write(&path, json).map_err(|e| Error::io(&path, e))
    }

    /// Validate required fields and warn about unknown keys.
    fn validate(&self, path: &Path) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::manifest_invalid(path, "'name' must be non-empty"));
        }
        if self.name.contains(['/', '\\']) || self.name.starts_with('.') {
            return Err(Error::manifest_invalid(
                path,
                format!("'{}' is not a valid package name", self.name),
            ));
        }
        if let Some(version) = &self.version {
            semver::Version::parse(version).map_err(|e| {
                Error::manifest_invalid(path, format!("invalid 'version' ({version}): {e}"))
            })?;
        }
        for key in self.extra.keys() {
            warn!(manifest = %path.display(), key, "ignoring unknown manifest key");
        }
        Ok(())
    }

    /// Parsed package version, when present.
    #[must_use]
    pub fn parsed_version(&self) -> Option<semver::Version> {
        self.version
            .as_deref()
            .and_then(|v| semver::Version::parse(v).ok())
    }

    /// Locate the enclosing package root by ascending from `start` until a
    /// directory containing `package.json` is found.
    ///
    /// # Errors
    /// `NoManifest` when the filesystem root is reached without a hit.
    pub fn find_root(start: &Path) -> Result<PathBuf> {
        for dir in start.ancestors() {
            if dir.join(MANIFEST_FILE).is_file() {
                return Ok(dir.to_path_buf());
            }
        }
        Err(Error::NoManifest {
            dir: start.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Manifest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn minimal_manifest() {
        let m = parse(r#"{"name": "bdb"}"#);
        assert_eq!(m.name, "bdb");
        assert!(m.version.is_none());
        assert!(m.dependencies.is_empty());
    }

    #[test]
    fn full_manifest() {
        let m = parse(
            r#"{
                "name": "bcoin",
                "version": "2.0.0",
                "main": "lib/bcoin.js",
                "remotes": {
                    "github": "https://github.com",
                    "local": "file:/data/repos"
                },
                "dependencies": {
                    "bdb": "github:bcoin-org/bdb#semver:~1.1.7",
                    "bcfg": "~2.0.0"
                },
                "scripts": {
                    "test": "echo ok"
                }
            }"#,
        );
        assert_eq!(m.version.as_deref(), Some("2.0.0"));
        assert_eq!(m.remotes.get("github"), Some("https://github.com"));
        assert_eq!(
            m.dependencies.get("bdb"),
            Some("github:bcoin-org/bdb#semver:~1.1.7")
        );
        assert_eq!(m.scripts.get("test"), Some("echo ok"));
    }

    #[test]
    fn dependency_order_is_declaration_order() {
        let m = parse(
            r#"{"name": "a", "dependencies": {"zebra": "*", "alpha": "*", "mid": "*"}}"#,
        );
        let names: Vec<&str> = m.dependencies.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["zebra", "alpha", "mid"]);
    }

    #[test]
    fn unknown_keys_are_kept() {
        let m = parse(r#"{"name": "a", "funding": "https://example.com"}"#);
        assert!(m.extra.contains_key("funding"));
    }

    #[test]
    fn missing_name_fails() {
        let err = serde_json::from_str::<Manifest>(r#"{"version": "1.0.0"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn load_validates_version() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"name": "a", "version": "not-a-version"}"#,
        )
        .unwrap();
        let err = Manifest::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ManifestInvalid);
    }

    #[test]
    fn load_missing_is_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NoManifest);
    }

    #[test]
    fn find_root_ascends() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("modules").join("foo");
        let lib = pkg.join("lib");
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(pkg.join(MANIFEST_FILE), r#"{"name": "foo"}"#).unwrap();

        assert_eq!(Manifest::find_root(&lib).unwrap(), pkg);
        assert_eq!(Manifest::find_root(&pkg).unwrap(), pkg);
    }

    #[test]
    fn find_root_misses() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("x").join("y");
        std::fs::create_dir_all(&deep).unwrap();
        assert!(Manifest::find_root(&deep).is_err());
    }

    #[test]
    fn save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = Manifest::skeleton("fresh");
        m.dependencies.insert("bdb", "~1.1.7");
        m.save(dir.path()).unwrap();

        let loaded = Manifest::load(dir.path()).unwrap();
        assert_eq!(loaded.name, "fresh");
        assert_eq!(loaded.dependencies.get("bdb"), Some("~1.1.7"));
    }

    #[test]
    fn string_map_insert_replaces_in_place() {
        let mut map = StringMap::new();
        map.insert("a", "1");
        map.insert("b", "2");
        map.insert("a", "3");
        let pairs: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(pairs, [("a", "3"), ("b", "2")]);
    }
}
