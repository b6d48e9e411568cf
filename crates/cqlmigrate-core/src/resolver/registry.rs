//! In-binary migration registry.
//!
//! Serves `embedded:` locations. Scripts are registered under a
//! slash-separated path and procedural units under the location they belong
//! to, so a binary can ship its migrations without touching the filesystem.

use super::procedural::ProceduralMigration;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Scripts and procedural units compiled into the binary.
#[derive(Clone, Default)]
pub struct MigrationRegistry {
    scripts: BTreeMap<String, Arc<str>>,
    units: BTreeMap<String, Arc<dyn ProceduralMigration>>,
}

impl MigrationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a script at `path`, e.g. `db/migration/V1__init.cql`.
    pub fn add_script(&mut self, path: &str, source: impl Into<Arc<str>>) {
        self.scripts.insert(normalize(path), source.into());
    }

    /// Register a procedural unit under `location`, e.g. `db/migration`.
    ///
    /// The unit is keyed by `<location>/<name>`.
    pub fn add_procedural(&mut self, location: &str, unit: Arc<dyn ProceduralMigration>) {
        let location = normalize(location);
        let key = if location.is_empty() {
            unit.name().to_string()
        } else {
            format!("{}/{}", location, unit.name())
        };
        self.units.insert(key, unit);
    }

    /// Builder form of [`add_script`](Self::add_script).
    pub fn with_script(mut self, path: &str, source: impl Into<Arc<str>>) -> Self {
        self.add_script(path, source);
        self
    }

    /// Builder form of [`add_procedural`](Self::add_procedural).
    pub fn with_procedural(mut self, location: &str, unit: Arc<dyn ProceduralMigration>) -> Self {
        self.add_procedural(location, unit);
        self
    }

    /// Scripts at or below `location`, ordered by path.
    pub fn scripts_under(&self, location: &str) -> Vec<(&str, Arc<str>)> {
        self.scripts
            .iter()
            .filter(|(path, _)| is_under(path, location))
            .map(|(path, source)| (path.as_str(), Arc::clone(source)))
            .collect()
    }

    /// Procedural units at or below `location`, ordered by key.
    pub fn units_under(&self, location: &str) -> Vec<(&str, Arc<dyn ProceduralMigration>)> {
        self.units
            .iter()
            .filter(|(key, _)| is_under(key, location))
            .map(|(key, unit)| (key.as_str(), Arc::clone(unit)))
            .collect()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.units.is_empty()
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("scripts", &self.scripts.keys().collect::<Vec<_>>())
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

fn is_under(path: &str, location: &str) -> bool {
    let location = location.trim_matches('/');
    location.is_empty()
        || path
            .strip_prefix(location)
            .is_some_and(|rest| rest.starts_with('/'))
}
