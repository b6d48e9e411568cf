//! Procedural migrations.
//!
//! A procedural unit is Rust code run against the session. It is named like
//! a script without extension (`V3_0__Third`) and takes its version and
//! description from that name unless it describes itself.

use super::naming::{parse_name, VERSION_PREFIX};
use super::registry::MigrationRegistry;
use super::{MigrationExecutor, MigrationResolver, MigrationType, ResolvedMigration};
use crate::error::{Error, Result};
use crate::location::ScriptsLocation;
use crate::session::Session;
use crate::version::MigrationVersion;
use std::sync::Arc;

/// A migration implemented in code.
pub trait ProceduralMigration: Send + Sync {
    /// Registry name, e.g. `V3_0__Third`.
    fn name(&self) -> &str;

    /// Version and description, when the unit describes itself instead of
    /// relying on its name.
    fn info(&self) -> Option<(MigrationVersion, String)> {
        None
    }

    /// Content checksum. Units without one record `0`.
    fn checksum(&self) -> Option<i32> {
        None
    }

    /// Apply the migration.
    fn migrate(&self, session: &dyn Session) -> Result<()>;
}

/// Runs a [`ProceduralMigration`].
pub struct ProceduralMigrationExecutor {
    unit: Arc<dyn ProceduralMigration>,
}

impl ProceduralMigrationExecutor {
    /// Wrap a unit.
    pub fn new(unit: Arc<dyn ProceduralMigration>) -> Self {
        Self { unit }
    }
}

impl MigrationExecutor for ProceduralMigrationExecutor {
    fn execute(&self, session: &dyn Session) -> Result<()> {
        self.unit.migrate(session)
    }
}

/// Resolves procedural units registered under an `embedded:` location.
pub struct ProceduralMigrationResolver {
    location: ScriptsLocation,
    registry: Arc<MigrationRegistry>,
}

impl ProceduralMigrationResolver {
    /// Create a resolver for one location.
    pub fn new(location: ScriptsLocation, registry: Arc<MigrationRegistry>) -> Self {
        Self { location, registry }
    }

    /// Build a candidate from a registered unit.
    pub fn extract(key: &str, unit: Arc<dyn ProceduralMigration>) -> Result<ResolvedMigration> {
        let (version, description) = match unit.info() {
            Some((version, description)) => {
                if description.trim().is_empty() {
                    return Err(Error::Naming {
                        name: unit.name().to_string(),
                        suggestion: format!("a non-empty description for migration {version}"),
                    });
                }
                (version, description)
            }
            None => parse_name(unit.name(), VERSION_PREFIX, "")?,
        };

        Ok(ResolvedMigration {
            version,
            description,
            script: key.to_string(),
            checksum: Some(unit.checksum().unwrap_or(0)),
            migration_type: MigrationType::Procedural,
            physical_location: format!("embedded:{key}"),
            executor: Arc::new(ProceduralMigrationExecutor::new(unit)),
        })
    }
}

impl MigrationResolver for ProceduralMigrationResolver {
    fn resolve(&self) -> Result<Vec<ResolvedMigration>> {
        // Filesystem locations only hold scripts.
        if !self.location.is_embedded() {
            return Ok(Vec::new());
        }

        let mut migrations = self
            .registry
            .units_under(self.location.path())
            .into_iter()
            .map(|(key, unit)| Self::extract(key, unit))
            .collect::<Result<Vec<_>>>()?;
        migrations.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(migrations)
    }
}
