//! Migration resolution.
//!
//! A [`MigrationResolver`] turns one kind of migration source into
//! [`ResolvedMigration`] candidates. [`CqlMigrationResolver`] reads
//! `V<version>__<description>.cql` scripts, [`ProceduralMigrationResolver`]
//! reads [`ProceduralMigration`] units from a [`MigrationRegistry`], and
//! [`CompositeResolver`] merges every configured resolver, drops exact
//! duplicates and rejects conflicting versions.

pub mod composite;
pub mod cql;
pub mod naming;
pub mod procedural;
pub mod registry;
pub mod scanner;

use crate::error::{Error, Result};
use crate::session::Session;
use crate::version::MigrationVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use composite::CompositeResolver;
pub use cql::{CqlMigrationExecutor, CqlMigrationResolver};
pub use procedural::{ProceduralMigration, ProceduralMigrationExecutor, ProceduralMigrationResolver};
pub use registry::MigrationRegistry;
pub use scanner::{FileSystemScanner, RegistryScanner, Resource, ResourceScanner};

/// Kind of migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationType {
    /// Synthetic baseline marker.
    Baseline,
    /// Declarative CQL script.
    Cql,
    /// Procedural unit run against the session.
    Procedural,
}

impl fmt::Display for MigrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationType::Baseline => write!(f, "BASELINE"),
            MigrationType::Cql => write!(f, "CQL"),
            MigrationType::Procedural => write!(f, "PROCEDURAL"),
        }
    }
}

impl FromStr for MigrationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BASELINE" => Ok(MigrationType::Baseline),
            "CQL" => Ok(MigrationType::Cql),
            "PROCEDURAL" => Ok(MigrationType::Procedural),
            _ => Err(Error::Serialization(format!("unknown migration type '{s}'"))),
        }
    }
}

/// Runs one resolved migration against a session.
pub trait MigrationExecutor: Send + Sync {
    /// Apply the migration. Any error aborts the migrate run.
    fn execute(&self, session: &dyn Session) -> Result<()>;
}

/// A migration candidate discovered by a resolver.
#[derive(Clone)]
pub struct ResolvedMigration {
    /// Version parsed from the name or supplied by the unit.
    pub version: MigrationVersion,
    /// Human readable description.
    pub description: String,
    /// Script name relative to its location, or the unit's registry path.
    pub script: String,
    /// Content checksum, if the source has one.
    pub checksum: Option<i32>,
    /// Kind of migration.
    pub migration_type: MigrationType,
    /// Where the candidate was found. Diagnostics only.
    pub physical_location: String,
    /// Applies the migration.
    pub executor: Arc<dyn MigrationExecutor>,
}

impl ResolvedMigration {
    /// `physical_location (TYPE)`, as used in conflict reports.
    pub fn offender(&self) -> String {
        format!("{} ({})", self.physical_location, self.migration_type)
    }
}

/// Identity ignores where the candidate was found and how it runs.
impl PartialEq for ResolvedMigration {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.description == other.description
            && self.script == other.script
            && self.checksum == other.checksum
            && self.migration_type == other.migration_type
    }
}

impl Eq for ResolvedMigration {}

impl fmt::Debug for ResolvedMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedMigration")
            .field("version", &self.version)
            .field("description", &self.description)
            .field("script", &self.script)
            .field("checksum", &self.checksum)
            .field("migration_type", &self.migration_type)
            .field("physical_location", &self.physical_location)
            .finish_non_exhaustive()
    }
}

/// A source of migration candidates.
pub trait MigrationResolver: Send + Sync {
    /// Resolve every candidate this source currently offers.
    fn resolve(&self) -> Result<Vec<ResolvedMigration>>;
}

impl<R: MigrationResolver + ?Sized> MigrationResolver for Arc<R> {
    fn resolve(&self) -> Result<Vec<ResolvedMigration>> {
        (**self).resolve()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub(crate) struct NoopExecutor;

    impl MigrationExecutor for NoopExecutor {
        fn execute(&self, _session: &dyn Session) -> Result<()> {
            Ok(())
        }
    }

    pub(crate) fn candidate(version: &str, description: &str, checksum: Option<i32>) -> ResolvedMigration {
        ResolvedMigration {
            version: MigrationVersion::parse(version).unwrap(),
            description: description.to_string(),
            script: format!("V{}__{}.cql", version.replace('.', "_"), description.replace(' ', "_")),
            checksum,
            migration_type: MigrationType::Cql,
            physical_location: format!("/migrations/V{version}.cql"),
            executor: Arc::new(NoopExecutor),
        }
    }

    /// A resolver serving a fixed list.
    pub(crate) struct FixedResolver(pub Vec<ResolvedMigration>);

    impl MigrationResolver for FixedResolver {
        fn resolve(&self) -> Result<Vec<ResolvedMigration>> {
            Ok(self.0.clone())
        }
    }
}
