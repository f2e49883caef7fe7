//! Version constraint handling (npm-style ranges).

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// npm-style version constraint.
///
/// The raw string is kept verbatim; matching normalizes it into a
/// `semver::VersionReq` on demand. Recognized forms: `*`, `~1.1.7`,
/// `^2.0`, comparator sets (`>=1.2.0 <2.0.0`), OR groups (`||`),
/// wildcard patterns (`1.x`, `1.2.*`) and bare versions (exact match).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionConstraint {
    raw: String,
}

impl VersionConstraint {
    /// Create from raw string.
    #[must_use]
    pub fn new(constraint: impl Into<String>) -> Self {
        Self {
            raw: constraint.into(),
        }
    }

    /// Any version.
    #[must_use]
    pub fn any() -> Self {
        Self::new("*")
    }

    /// Get the raw constraint string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check whether a string looks like a version constraint rather than
    /// a remote source. Constraints start with a semver operator, a digit,
    /// or a wildcard.
    #[must_use]
    pub fn is_constraint(s: &str) -> bool {
        let s = s.trim();
        matches!(
            s.chars().next(),
            Some('~' | '^' | '>' | '<' | '=' | '*') | Some('0'..='9')
        )
    }

    /// Check if a version matches this constraint.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        let raw = self.raw.trim();
        if raw == "*" {
            return true;
        }
        // The semver crate has no OR operator; each alternative matches
        // independently.
        if raw.contains("||") {
            return raw.split("||").any(|alt| {
                let alt = alt.trim();
                !alt.is_empty() && Self::new(alt).matches(version)
            });
        }
        self.to_req().is_some_and(|req| req.matches(version))
    }

    /// Pick the highest version matching this constraint.
    #[must_use]
    pub fn max_satisfying<'a, I>(&self, versions: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        versions
            .into_iter()
            .filter(|v| self.matches(v))
            .max_by(|a, b| a.cmp(b))
    }

    /// Convert to a semver `VersionReq`.
    fn to_req(&self) -> Option<VersionReq> {
        VersionReq::parse(&self.normalize()).ok()
    }

    /// Normalize an npm constraint into semver-crate syntax.
    fn normalize(&self) -> String {
        let s = self.raw.trim();

        if s.is_empty() || s == "*" {
            return "*".to_string();
        }

        // Space-separated comparators are an AND set in npm; the semver
        // crate wants commas.
        if s.contains(' ') && !s.contains(',') {
            return s
                .split_whitespace()
                .map(|p| Self::new(p).normalize())
                .collect::<Vec<_>>()
                .join(", ");
        }
        if s.contains(',') {
            return s
                .split(',')
                .map(|p| Self::new(p.trim()).normalize())
                .collect::<Vec<_>>()
                .join(", ");
        }

        // Wildcard patterns: 1.x, 1.2.*
        let lower = s.to_ascii_lowercase();
        if lower.ends_with(".*") || lower.ends_with(".x") {
            let prefix = &s[..s.len() - 2];
            let parts: Vec<&str> = prefix.split('.').collect();
            return match parts.len() {
                1 => format!(
                    ">={}.0.0, <{}.0.0",
                    parts[0],
                    parts[0].parse::<u64>().unwrap_or(0) + 1
                ),
                2 => format!(
                    ">={}.{}.0, <{}.{}.0",
                    parts[0],
                    parts[1],
                    parts[0],
                    parts[1].parse::<u64>().unwrap_or(0) + 1
                ),
                _ => s.to_string(),
            };
        }

        if let Some(rest) = s.strip_prefix('^') {
            return format!("^{}", Self::pad(rest));
        }
        if let Some(rest) = s.strip_prefix('~') {
            return format!("~{}", Self::pad(rest));
        }
        if s.starts_with(">=")
            || s.starts_with("<=")
            || s.starts_with('>')
            || s.starts_with('<')
            || s.starts_with('=')
        {
            return s.to_string();
        }

        // Bare version is an exact match.
        format!("={}", Self::pad(s))
    }

    /// Pad a partial version out to major.minor.patch.
    fn pad(v: &str) -> String {
        let v = v.trim().trim_start_matches('v');
        match v.chars().filter(|&c| c == '.').count() {
            0 => format!("{v}.0.0"),
            1 => format!("{v}.0"),
            _ => v.to_string(),
        }
    }
}

impl Default for VersionConstraint {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for VersionConstraint {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
