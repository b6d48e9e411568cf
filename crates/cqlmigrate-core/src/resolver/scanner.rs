//! Resource discovery for script locations.

use super::registry::MigrationRegistry;
use crate::error::{Error, Result};
use crate::location::ScriptsLocation;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
enum Content {
    File(PathBuf),
    Embedded(Arc<str>),
}

/// A discovered script.
#[derive(Debug, Clone)]
pub struct Resource {
    location: String,
    filename: String,
    physical_location: String,
    content: Content,
}

impl Resource {
    /// A resource backed by a file on disk.
    pub fn file(location: impl Into<String>, path: PathBuf) -> Self {
        let location = location.into();
        let physical_location = fs::canonicalize(&path)
            .unwrap_or_else(|_| path.clone())
            .display()
            .to_string();
        Self {
            filename: filename_of(&location),
            location,
            physical_location,
            content: Content::File(path),
        }
    }

    /// A resource held in memory.
    pub fn embedded(location: impl Into<String>, source: Arc<str>) -> Self {
        let location = location.into();
        Self {
            filename: filename_of(&location),
            physical_location: format!("embedded:{location}"),
            location,
            content: Content::Embedded(source),
        }
    }

    /// Slash-separated path including the location path.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Last path component.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Where the resource lives, for diagnostics.
    pub fn physical_location(&self) -> &str {
        &self.physical_location
    }

    /// Path relative to the scanned location.
    pub fn relative_to(&self, location: &ScriptsLocation) -> String {
        let base = location.path();
        if base.is_empty() {
            return self.location.clone();
        }
        self.location
            .strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.location)
            .to_string()
    }

    /// Read the resource as text, without a leading byte order mark.
    pub fn load_as_string(&self) -> Result<String> {
        let text = match &self.content {
            Content::File(path) => fs::read_to_string(path)?,
            Content::Embedded(source) => source.to_string(),
        };
        Ok(match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        })
    }
}

fn filename_of(location: &str) -> String {
    location.rsplit('/').next().unwrap_or(location).to_string()
}

/// Lists resources in a location.
pub trait ResourceScanner: Send + Sync {
    /// Resources whose file name starts with `prefix` and ends with `suffix`,
    /// sorted by location.
    fn scan(&self, location: &ScriptsLocation, prefix: &str, suffix: &str) -> Result<Vec<Resource>>;
}

/// Walks `filesystem:` locations recursively.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemScanner;

impl FileSystemScanner {
    fn walk(
        dir: &Path,
        location: &str,
        prefix: &str,
        suffix: &str,
        found: &mut Vec<Resource>,
    ) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let child = if location.is_empty() {
                name.clone()
            } else {
                format!("{location}/{name}")
            };

            if entry.file_type()?.is_dir() {
                Self::walk(&path, &child, prefix, suffix, found)?;
            } else if name.starts_with(prefix) && name.ends_with(suffix) {
                found.push(Resource::file(child, path));
            }
        }
        Ok(())
    }
}

impl ResourceScanner for FileSystemScanner {
    fn scan(&self, location: &ScriptsLocation, prefix: &str, suffix: &str) -> Result<Vec<Resource>> {
        if !location.is_filesystem() {
            return Err(Error::Location {
                descriptor: location.descriptor(),
                reason: "not a filesystem location".to_string(),
            });
        }

        let root = if location.path().is_empty() {
            Path::new(".")
        } else {
            Path::new(location.path())
        };
        if !root.is_dir() {
            warn!(location = %location, "unable to resolve location, skipping");
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        Self::walk(root, location.path(), prefix, suffix, &mut found)?;
        found.sort_by(|a, b| a.location.cmp(&b.location));
        debug!(location = %location, count = found.len(), "scanned filesystem location");
        Ok(found)
    }
}

/// Serves `embedded:` locations from a [`MigrationRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryScanner {
    registry: Arc<MigrationRegistry>,
}

impl RegistryScanner {
    /// Create a scanner over a registry.
    pub fn new(registry: Arc<MigrationRegistry>) -> Self {
        Self { registry }
    }
}

impl ResourceScanner for RegistryScanner {
    fn scan(&self, location: &ScriptsLocation, prefix: &str, suffix: &str) -> Result<Vec<Resource>> {
        if !location.is_embedded() {
            return Err(Error::Location {
                descriptor: location.descriptor(),
                reason: "not an embedded location".to_string(),
            });
        }

        let found: Vec<Resource> = self
            .registry
            .scripts_under(location.path())
            .into_iter()
            .filter(|(path, _)| {
                let name = filename_of(path);
                name.starts_with(prefix) && name.ends_with(suffix)
            })
            .map(|(path, source)| Resource::embedded(path, source))
            .collect();
        debug!(location = %location, count = found.len(), "scanned embedded location");
        Ok(found)
    }
}
