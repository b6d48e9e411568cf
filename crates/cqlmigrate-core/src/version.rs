//! Migration version ordering.
//!
//! A version is a dot-separated sequence of non-negative integers. Components
//! are compared numerically with arbitrary precision, and a shorter sequence is
//! padded with zeros, so `1`, `1.0` and `001.00` are the same version.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Error raised when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version '{input}': {reason}")]
pub struct VersionFormatError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Kind {
    Empty,
    Finite,
    Latest,
}

/// A version of a migration.
#[derive(Debug, Clone)]
pub struct MigrationVersion {
    kind: Kind,
    /// Components with leading zeros stripped and trailing zero components
    /// removed. Equality, ordering and hashing are defined on this alone.
    parts: Vec<String>,
    display: String,
}

impl MigrationVersion {
    /// The version of an empty schema. Orders before every finite version.
    pub const EMPTY: MigrationVersion = MigrationVersion {
        kind: Kind::Empty,
        parts: Vec::new(),
        display: String::new(),
    };

    /// The latest version. Orders after every finite version.
    pub const LATEST: MigrationVersion = MigrationVersion {
        kind: Kind::Latest,
        parts: Vec::new(),
        display: String::new(),
    };

    /// Parse a version such as `6`, `6.0`, `005`, `1.2.3.4` or `201004200021`.
    ///
    /// Underscores are accepted as separators and normalised to dots.
    pub fn parse(input: &str) -> Result<Self, VersionFormatError> {
        let normalized = input.replace('_', ".");
        let fail = |reason| VersionFormatError {
            input: input.to_string(),
            reason,
        };

        if normalized.is_empty() {
            return Err(fail("version is empty"));
        }

        let mut parts = Vec::new();
        for token in normalized.split('.') {
            if token.is_empty() {
                return Err(fail("empty component"));
            }
            if !token.bytes().all(|b| b.is_ascii_digit()) {
                return Err(fail("only digits and '.' are allowed"));
            }
            let trimmed = token.trim_start_matches('0');
            parts.push(if trimmed.is_empty() { "0" } else { trimmed }.to_string());
        }

        while parts.last().is_some_and(|p| p == "0") {
            parts.pop();
        }

        Ok(Self {
            kind: Kind::Finite,
            parts,
            display: normalized,
        })
    }

    /// Whether this is the empty-schema sentinel.
    pub fn is_empty(&self) -> bool {
        self.kind == Kind::Empty
    }

    /// Whether this is the latest-version sentinel.
    pub fn is_latest(&self) -> bool {
        self.kind == Kind::Latest
    }

    /// The version text as written, with underscores normalised to dots.
    ///
    /// Returns `None` for the sentinels.
    pub fn as_str(&self) -> Option<&str> {
        match self.kind {
            Kind::Finite => Some(&self.display),
            Kind::Empty | Kind::Latest => None,
        }
    }
}

fn compare_component(a: &str, b: &str) -> Ordering {
    // Both are stripped of leading zeros, so length decides first.
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl Ord for MigrationVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.kind != Kind::Finite || other.kind != Kind::Finite {
            return self.kind.cmp(&other.kind);
        }

        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).map_or("0", String::as_str);
            let b = other.parts.get(i).map_or("0", String::as_str);
            match compare_component(a, b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for MigrationVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MigrationVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MigrationVersion {}

impl Hash for MigrationVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.parts.hash(state);
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Empty => write!(f, "<< Empty Schema >>"),
            Kind::Latest => write!(f, "<< Latest Version >>"),
            Kind::Finite => write!(f, "{}", self.display),
        }
    }
}

impl FromStr for MigrationVersion {
    type Err = VersionFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MigrationVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MigrationVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// The upper bound a migrate or info run works towards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Target {
    /// Every resolved migration.
    #[default]
    Latest,
    /// The highest version already applied; nothing new is pending.
    Current,
    /// An explicit ceiling; higher versions are left alone.
    Version(MigrationVersion),
}

impl Target {
    /// Parse `latest`, `current` (case-insensitive) or a version string.
    pub fn parse(input: &str) -> Result<Self, VersionFormatError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("latest") {
            Ok(Target::Latest)
        } else if trimmed.eq_ignore_ascii_case("current") {
            Ok(Target::Current)
        } else {
            MigrationVersion::parse(trimmed).map(Target::Version)
        }
    }

    /// Resolve to a concrete ceiling given the highest applied version.
    pub fn ceiling(&self, current: Option<&MigrationVersion>) -> MigrationVersion {
        match self {
            Target::Latest => MigrationVersion::LATEST,
            Target::Current => current.cloned().unwrap_or(MigrationVersion::EMPTY),
            Target::Version(v) => v.clone(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Latest => write!(f, "latest"),
            Target::Current => write!(f, "current"),
            Target::Version(v) => write!(f, "{}", v),
        }
    }
}
