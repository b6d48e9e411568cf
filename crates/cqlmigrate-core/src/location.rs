//! Script locations.
//!
//! A location is a `prefix:path` descriptor. `filesystem:` points at a
//! directory on disk; `embedded:` points into a [`MigrationRegistry`]
//! compiled into the binary. Any other descriptor, including one with a
//! drive letter such as `C:\migrations`, is a filesystem path.
//!
//! [`MigrationRegistry`]: crate::resolver::MigrationRegistry

use crate::error::{Error, Result};
use std::fmt;
use tracing::warn;

/// Prefix of on-disk locations.
pub const FILESYSTEM_PREFIX: &str = "filesystem:";

/// Prefix of in-binary registry locations.
pub const EMBEDDED_PREFIX: &str = "embedded:";

/// Where a location's scripts come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocationKind {
    /// A directory on disk.
    FileSystem,
    /// A path inside the migration registry.
    Embedded,
}

/// A single location to scan for migrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptsLocation {
    kind: LocationKind,
    path: String,
}

impl ScriptsLocation {
    /// Parse a location descriptor.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let normalized = descriptor.trim().replace('\\', "/");
        if normalized.is_empty() {
            return Err(Error::Location {
                descriptor: descriptor.to_string(),
                reason: "location is empty".to_string(),
            });
        }

        let (kind, path) = if let Some(path) = normalized.strip_prefix(FILESYSTEM_PREFIX) {
            (LocationKind::FileSystem, path.to_string())
        } else if let Some(path) = normalized.strip_prefix(EMBEDDED_PREFIX) {
            (LocationKind::Embedded, path.to_string())
        } else {
            (LocationKind::FileSystem, normalized)
        };

        let mut path = match kind {
            LocationKind::Embedded => path.trim_start_matches('/').to_string(),
            LocationKind::FileSystem => path,
        };
        if path.len() > 1 && path.ends_with('/') {
            path.pop();
        }

        Ok(Self { kind, path })
    }

    /// The kind of location.
    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    /// The path without prefix.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether this is an on-disk location.
    pub fn is_filesystem(&self) -> bool {
        self.kind == LocationKind::FileSystem
    }

    /// Whether this is a registry location.
    pub fn is_embedded(&self) -> bool {
        self.kind == LocationKind::Embedded
    }

    /// The normalised `prefix:path` descriptor.
    pub fn descriptor(&self) -> String {
        self.to_string()
    }

    /// Whether `other` lies inside this location.
    pub fn is_parent_of(&self, other: &ScriptsLocation) -> bool {
        if self.kind != other.kind {
            return false;
        }
        if self.path.is_empty() {
            return true;
        }
        format!("{}/", other.path).starts_with(&format!("{}/", self.path))
    }
}

impl fmt::Display for ScriptsLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            LocationKind::FileSystem => FILESYSTEM_PREFIX,
            LocationKind::Embedded => EMBEDDED_PREFIX,
        };
        write!(f, "{}{}", prefix, self.path)
    }
}

/// The set of locations to scan.
///
/// Sorted, with duplicates and locations nested inside another configured
/// location removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptsLocations {
    locations: Vec<ScriptsLocation>,
}

impl ScriptsLocations {
    /// Parse and normalise a list of descriptors.
    pub fn new<I, S>(descriptors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = descriptors
            .into_iter()
            .map(|d| ScriptsLocation::parse(d.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        parsed.sort();

        let mut locations: Vec<ScriptsLocation> = Vec::with_capacity(parsed.len());
        for location in parsed {
            if locations.contains(&location) {
                warn!(location = %location, "discarding duplicate location");
                continue;
            }
            if let Some(parent) = locations.iter().find(|p| p.is_parent_of(&location)) {
                warn!(
                    location = %location,
                    parent = %parent,
                    "discarding location as it is a sub-location of another configured location"
                );
                continue;
            }
            locations.push(location);
        }

        Ok(Self { locations })
    }

    /// The normalised locations in order.
    pub fn locations(&self) -> &[ScriptsLocation] {
        &self.locations
    }

    /// Iterate over the locations.
    pub fn iter(&self) -> std::slice::Iter<'_, ScriptsLocation> {
        self.locations.iter()
    }

    /// Number of locations.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether no location is configured.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl<'a> IntoIterator for &'a ScriptsLocations {
    type Item = &'a ScriptsLocation;
    type IntoIter = std::slice::Iter<'a, ScriptsLocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.locations.iter()
    }
}
