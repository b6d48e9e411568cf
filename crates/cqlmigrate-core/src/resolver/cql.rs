//! CQL script migrations.

use super::naming::{parse_name, CQL_SUFFIX, VERSION_PREFIX};
use super::registry::MigrationRegistry;
use super::scanner::{FileSystemScanner, RegistryScanner, Resource, ResourceScanner};
use super::{MigrationExecutor, MigrationResolver, MigrationType, ResolvedMigration};
use crate::error::Result;
use crate::location::ScriptsLocation;
use crate::script::CqlScript;
use crate::session::{Consistency, Session};
use std::sync::Arc;

/// Checksum of script text.
///
/// The first four bytes of a BLAKE3 hash over the lines without their
/// terminators, read as a big-endian `i32`. Line endings therefore do not
/// affect the value.
pub fn checksum(source: &str) -> i32 {
    let mut hasher = blake3::Hasher::new();
    for line in source.lines() {
        hasher.update(line.as_bytes());
    }
    let hash = hasher.finalize();
    let bytes = hash.as_bytes();
    i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Executes a CQL script resource.
pub struct CqlMigrationExecutor {
    resource: Resource,
    consistency: Option<Consistency>,
}

impl CqlMigrationExecutor {
    /// Wrap a resource. Statements run at the topology default level.
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            consistency: None,
        }
    }

    /// Run statements at a fixed level.
    pub fn with_consistency(mut self, consistency: Option<Consistency>) -> Self {
        self.consistency = consistency;
        self
    }
}

impl MigrationExecutor for CqlMigrationExecutor {
    fn execute(&self, session: &dyn Session) -> Result<()> {
        let script = CqlScript::parse(&self.resource.load_as_string()?);
        let consistency = match self.consistency {
            Some(consistency) => consistency,
            None => Consistency::for_topology(session.hosts()?.len()),
        };
        script.execute(session, consistency)?;
        Ok(())
    }
}

/// Resolves `V<version>__<description>.cql` scripts in one location.
pub struct CqlMigrationResolver {
    location: ScriptsLocation,
    scanner: Box<dyn ResourceScanner>,
    consistency: Option<Consistency>,
}

impl CqlMigrationResolver {
    /// Create a resolver for a location, scanning the filesystem or the
    /// registry depending on its prefix.
    pub fn new(location: ScriptsLocation, registry: Arc<MigrationRegistry>) -> Self {
        let scanner: Box<dyn ResourceScanner> = if location.is_embedded() {
            Box::new(RegistryScanner::new(registry))
        } else {
            Box::new(FileSystemScanner)
        };
        Self {
            location,
            scanner,
            consistency: None,
        }
    }

    /// Create a resolver with a custom scanner.
    pub fn with_scanner(location: ScriptsLocation, scanner: Box<dyn ResourceScanner>) -> Self {
        Self {
            location,
            scanner,
            consistency: None,
        }
    }

    /// Run resolved scripts at a fixed consistency level.
    pub fn with_consistency(mut self, consistency: Option<Consistency>) -> Self {
        self.consistency = consistency;
        self
    }

    fn extract(&self, resource: Resource) -> Result<ResolvedMigration> {
        let (version, description) = parse_name(resource.filename(), VERSION_PREFIX, CQL_SUFFIX)?;
        let source = resource.load_as_string()?;
        Ok(ResolvedMigration {
            version,
            description,
            script: resource.relative_to(&self.location),
            checksum: Some(checksum(&source)),
            migration_type: MigrationType::Cql,
            physical_location: resource.physical_location().to_string(),
            executor: Arc::new(
                CqlMigrationExecutor::new(resource).with_consistency(self.consistency),
            ),
        })
    }
}

impl MigrationResolver for CqlMigrationResolver {
    fn resolve(&self) -> Result<Vec<ResolvedMigration>> {
        let resources = self.scanner.scan(&self.location, VERSION_PREFIX, CQL_SUFFIX)?;
        let mut migrations = resources
            .into_iter()
            .map(|resource| self.extract(resource))
            .collect::<Result<Vec<_>>>()?;
        migrations.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(migrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::session::testing::RecordingSession;
    use crate::session::EmbeddedCluster;
    use std::fs;

    #[test]
    fn test_checksum_ignores_line_endings() {
        let unix = "CREATE TABLE a (id int PRIMARY KEY);\nDROP TABLE a;\n";
        let windows = "CREATE TABLE a (id int PRIMARY KEY);\r\nDROP TABLE a;\r\n";
        assert_eq!(checksum(unix), checksum(windows));
        assert_ne!(checksum(unix), checksum("DROP TABLE a;"));
    }

    #[test]
    fn test_resolve_filesystem_scripts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("V1_1__Add_users.cql"), "CREATE TABLE users (id int PRIMARY KEY);").unwrap();
        fs::write(dir.path().join("nested").join("V1__Init.cql"), "").unwrap();

        let location = ScriptsLocation::parse(&format!("filesystem:{}", dir.path().display())).unwrap();
        let resolver = CqlMigrationResolver::new(location, Arc::new(MigrationRegistry::new()));
        let migrations = resolver.resolve().unwrap();

        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].version.to_string(), "1");
        assert_eq!(migrations[0].script, "nested/V1__Init.cql");
        assert_eq!(migrations[1].description, "Add users");
        assert_eq!(migrations[1].migration_type, MigrationType::Cql);
        assert_eq!(
            migrations[1].checksum,
            Some(checksum("CREATE TABLE users (id int PRIMARY KEY);"))
        );
        assert!(migrations[1].physical_location.ends_with("V1_1__Add_users.cql"));
    }

    #[test]
    fn test_bad_script_name() {
        let registry = MigrationRegistry::new().with_script("db/V1-init.cql", "");
        let resolver = CqlMigrationResolver::new(
            ScriptsLocation::parse("embedded:db").unwrap(),
            Arc::new(registry),
        );
        let err = resolver.resolve().unwrap_err();
        assert!(err.to_string().contains("V1_2__Description.cql"));
        assert!(matches!(err, Error::Naming { .. }));
    }

    #[test]
    fn test_executor_runs_statements() {
        let registry = MigrationRegistry::new().with_script(
            "db/V1__Init.cql",
            "CREATE TABLE a (id int PRIMARY KEY);\n-- seed\nINSERT INTO a (id) VALUES (1);",
        );
        let resolver = CqlMigrationResolver::new(
            ScriptsLocation::parse("embedded:db").unwrap(),
            Arc::new(registry),
        );
        let migration = resolver.resolve().unwrap().remove(0);

        let cluster = EmbeddedCluster::temporary().unwrap();
        cluster.create_keyspace("ks").unwrap();
        let session = cluster.connect("ks").unwrap();
        migration.executor.execute(&session).unwrap();

        assert!(session.table_exists("a").unwrap());
        assert_eq!(session.journal().unwrap().len(), 2);
    }

    #[test]
    fn test_executor_consistency() {
        let registry = Arc::new(MigrationRegistry::new().with_script(
            "db/V1__Init.cql",
            "CREATE TABLE a (id int PRIMARY KEY);\nINSERT INTO a (id) VALUES (1);",
        ));
        let location = ScriptsLocation::parse("embedded:db").unwrap();

        let cluster = EmbeddedCluster::temporary().unwrap();
        cluster.create_keyspace("ks").unwrap();

        let topology = RecordingSession::new(cluster.connect("ks").unwrap(), 3);
        CqlMigrationResolver::new(location.clone(), Arc::clone(&registry))
            .resolve()
            .unwrap()
            .remove(0)
            .executor
            .execute(&topology)
            .unwrap();
        assert_eq!(topology.seen(), vec![Consistency::All, Consistency::All]);

        topology.inner.drop_table("a").unwrap();
        let fixed = RecordingSession::new(cluster.connect("ks").unwrap(), 3);
        CqlMigrationResolver::new(location, registry)
            .with_consistency(Some(Consistency::Quorum))
            .resolve()
            .unwrap()
            .remove(0)
            .executor
            .execute(&fixed)
            .unwrap();
        assert_eq!(fixed.seen(), vec![Consistency::Quorum, Consistency::Quorum]);
    }
}
