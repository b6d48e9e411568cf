//! The applied ledger.
//!
//! The ledger lives in the migrated keyspace: a table keyed by version with
//! one row per applied migration, and a counter table whose `installed_rank`
//! counter numbers rows in application order.
//!
//! `version_rank` is recomputed on insert. Inserting a version below the
//! current maximum shifts the rank of every higher row by one, written in the
//! same batch as the new row. The counter increment and that batch are two
//! separate writes, so two processes inserting out-of-order versions at once
//! can interleave between them and leave duplicate or skewed version ranks.

mod applied;

pub use applied::AppliedMigration;

use crate::config::MigrationConfig;
use crate::error::Result;
use crate::resolver::MigrationType;
use crate::session::{Consistency, Row, Session, SessionError, TableSpec};
use crate::version::MigrationVersion;
use tracing::{debug, info};

/// Counter key generating `installed_rank`.
const INSTALLED_RANK_COUNTER: &str = "installed_rank";

/// Primary key column of the ledger table.
const VERSION_COLUMN: &str = "version";

/// Primary key column of the counter table.
const COUNTER_NAME_COLUMN: &str = "name";

/// Ledger of applied migrations.
pub struct AppliedLedger<'a> {
    session: &'a dyn Session,
    table: String,
    counts_table: String,
    consistency: Consistency,
}

impl<'a> AppliedLedger<'a> {
    /// Open the ledger for a session.
    ///
    /// The consistency level is fixed here: the configured one if any,
    /// otherwise derived from the topology the session reports (`ALL` for
    /// several hosts, `ONE` for a single node).
    pub fn new(session: &'a dyn Session, config: &MigrationConfig) -> Result<Self> {
        let hosts = session.hosts()?;
        let consistency = config
            .consistency
            .unwrap_or_else(|| Consistency::for_topology(hosts.len()));
        debug!(
            keyspace = session.keyspace(),
            hosts = hosts.len(),
            consistency = %consistency,
            "opened applied ledger"
        );
        Ok(Self {
            session,
            table: config.table_name(),
            counts_table: config.counts_table_name(),
            consistency,
        })
    }

    /// Name of the ledger table.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Consistency used for every ledger statement.
    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    /// Create the ledger tables if they do not exist. Safe to call repeatedly.
    pub fn ensure_schema(&self) -> Result<()> {
        if self.tables_exist()? {
            return Ok(());
        }

        info!(
            keyspace = self.session.keyspace(),
            table = %self.table,
            "creating applied ledger"
        );
        self.session.create_table(
            &TableSpec::regular(self.table.as_str(), VERSION_COLUMN),
            self.consistency,
        )?;
        self.session.create_table(
            &TableSpec::counter(self.counts_table.as_str(), COUNTER_NAME_COLUMN),
            self.consistency,
        )?;
        Ok(())
    }

    /// Whether both ledger tables exist.
    ///
    /// Checks with a read on each table rather than trusting schema metadata,
    /// which can lag behind a dropped table.
    pub fn tables_exist(&self) -> Result<bool> {
        for table in [&self.table, &self.counts_table] {
            match self.session.select(table, Some(1), self.consistency) {
                Ok(_) => {}
                Err(SessionError::InvalidQuery(_)) => return Ok(false),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }

    /// Record a migration, assigning both ranks and the server timestamp.
    pub fn insert(&self, migration: AppliedMigration) -> Result<AppliedMigration> {
        let installed_rank = self.session.increment_counter(
            &self.counts_table,
            INSTALLED_RANK_COUNTER,
            1,
            self.consistency,
        )?;

        let mut existing = self.find_applied(None)?;
        existing.sort_by(|a, b| a.version.cmp(&b.version));

        let mut rows: Vec<Row> = Vec::new();
        let version_rank = match existing.iter().position(|m| m.version > migration.version) {
            None => existing.len() + 1,
            Some(index) => {
                for shifted in &existing[index..] {
                    let mut row = Row::new();
                    row.insert(VERSION_COLUMN.to_string(), shifted.key().into());
                    row.insert(
                        "version_rank".to_string(),
                        (shifted.version_rank + 1).into(),
                    );
                    rows.push(row);
                }
                index + 1
            }
        };

        let record = AppliedMigration {
            version_rank: i32::try_from(version_rank).unwrap_or(i32::MAX),
            installed_rank: i32::try_from(installed_rank).unwrap_or(i32::MAX),
            installed_on: self.session.now()?,
            ..migration
        };
        rows.push(record.to_row()?);

        self.session
            .batch_upsert(&self.table, rows, self.consistency)?;
        debug!(
            version = %record.version,
            version_rank = record.version_rank,
            installed_rank = record.installed_rank,
            "recorded applied migration"
        );
        Ok(record)
    }

    /// Every recorded migration, optionally of one type, in installed order.
    ///
    /// Empty when the ledger has not been created yet.
    pub fn find_applied(&self, filter: Option<MigrationType>) -> Result<Vec<AppliedMigration>> {
        if !self.tables_exist()? {
            return Ok(Vec::new());
        }

        let rows = self.session.select(&self.table, None, self.consistency)?;
        let mut migrations = rows
            .into_iter()
            .map(AppliedMigration::from_row)
            .collect::<Result<Vec<_>>>()?;
        if let Some(kind) = filter {
            migrations.retain(|m| m.migration_type == kind);
        }
        migrations.sort_by_key(|m| m.installed_rank);
        Ok(migrations)
    }

    /// Whether any migration other than a baseline marker is recorded.
    pub fn has_applied(&self) -> Result<bool> {
        Ok(self
            .find_applied(None)?
            .iter()
            .any(|m| m.migration_type != MigrationType::Baseline))
    }

    /// Record a baseline marker.
    pub fn add_baseline_marker(
        &self,
        version: MigrationVersion,
        description: &str,
        user: &str,
    ) -> Result<AppliedMigration> {
        self.insert(AppliedMigration::new(
            version,
            description,
            MigrationType::Baseline,
            description,
            None,
            user,
            0,
            true,
        ))
    }

    /// Whether a baseline marker is recorded.
    pub fn has_baseline_marker(&self) -> Result<bool> {
        Ok(self.baseline_marker()?.is_some())
    }

    /// The baseline marker, if any.
    pub fn baseline_marker(&self) -> Result<Option<AppliedMigration>> {
        Ok(self
            .find_applied(Some(MigrationType::Baseline))?
            .into_iter()
            .next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::RecordingSession;
    use crate::session::{EmbeddedCluster, EmbeddedSession};

    fn session() -> (EmbeddedCluster, EmbeddedSession) {
        let cluster = EmbeddedCluster::temporary().unwrap();
        cluster.create_keyspace("ks").unwrap();
        let session = cluster.connect("ks").unwrap();
        (cluster, session)
    }

    fn applied(version: &str) -> AppliedMigration {
        AppliedMigration::new(
            MigrationVersion::parse(version).unwrap(),
            format!("migration {version}"),
            MigrationType::Cql,
            format!("V{version}__x.cql"),
            Some(1),
            "tester",
            3,
            true,
        )
    }

    fn ranks(ledger: &AppliedLedger<'_>) -> Vec<(String, i32, i32)> {
        let mut all = ledger.find_applied(None).unwrap();
        all.sort_by(|a, b| a.version.cmp(&b.version));
        all.into_iter()
            .map(|m| (m.version.to_string(), m.version_rank, m.installed_rank))
            .collect()
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let (_cluster, session) = session();
        let config = MigrationConfig::new("ks");
        let ledger = AppliedLedger::new(&session, &config).unwrap();

        assert!(!ledger.tables_exist().unwrap());
        assert!(ledger.find_applied(None).unwrap().is_empty());
        ledger.ensure_schema().unwrap();
        ledger.ensure_schema().unwrap();
        assert!(ledger.tables_exist().unwrap());
        assert!(session.table_exists("cassandra_migration_version_counts").unwrap());
        assert_eq!(ledger.consistency(), Consistency::One);
    }

    #[test]
    fn test_dropped_table_is_recreated() {
        let (_cluster, session) = session();
        let config = MigrationConfig::new("ks").with_table_prefix("app_");
        let ledger = AppliedLedger::new(&session, &config).unwrap();
        ledger.ensure_schema().unwrap();

        session.drop_table("app_cassandra_migration_version_counts").unwrap();
        assert!(!ledger.tables_exist().unwrap());
        ledger.ensure_schema().unwrap();
        assert!(ledger.tables_exist().unwrap());
    }

    #[test]
    fn test_topology_consistency_on_cluster() {
        let (_cluster, session) = session();
        let cluster_session = RecordingSession::new(session, 3);
        let ledger = AppliedLedger::new(&cluster_session, &MigrationConfig::new("ks")).unwrap();
        assert_eq!(ledger.consistency(), Consistency::All);
    }

    #[test]
    fn test_configured_consistency_overrides_topology() {
        let (_cluster, session) = session();
        let cluster_session = RecordingSession::new(session, 3);
        let config = MigrationConfig::new("ks").with_consistency(Consistency::Quorum);
        let ledger = AppliedLedger::new(&cluster_session, &config).unwrap();
        assert_eq!(ledger.consistency(), Consistency::Quorum);

        ledger.ensure_schema().unwrap();
        ledger.insert(applied("1")).unwrap();
        let seen = cluster_session.seen();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|c| *c == Consistency::Quorum));
    }

    #[test]
    fn test_in_order_ranks() {
        let (_cluster, session) = session();
        let config = MigrationConfig::new("ks");
        let ledger = AppliedLedger::new(&session, &config).unwrap();
        ledger.ensure_schema().unwrap();

        for v in ["1", "1.1", "2"] {
            ledger.insert(applied(v)).unwrap();
        }
        assert_eq!(
            ranks(&ledger),
            vec![
                ("1".to_string(), 1, 1),
                ("1.1".to_string(), 2, 2),
                ("2".to_string(), 3, 3)
            ]
        );
    }

    #[test]
    fn test_out_of_order_insert_shifts_higher_ranks() {
        let (_cluster, session) = session();
        let config = MigrationConfig::new("ks");
        let ledger = AppliedLedger::new(&session, &config).unwrap();
        ledger.ensure_schema().unwrap();

        for v in ["1", "2", "3"] {
            ledger.insert(applied(v)).unwrap();
        }
        let record = ledger.insert(applied("1.5")).unwrap();
        assert_eq!(record.version_rank, 2);
        assert_eq!(record.installed_rank, 4);

        assert_eq!(
            ranks(&ledger),
            vec![
                ("1".to_string(), 1, 1),
                ("1.5".to_string(), 2, 4),
                ("2".to_string(), 3, 2),
                ("3".to_string(), 4, 3)
            ]
        );
    }

    #[test]
    fn test_baseline_marker() {
        let (_cluster, session) = session();
        let config = MigrationConfig::new("ks");
        let ledger = AppliedLedger::new(&session, &config).unwrap();
        ledger.ensure_schema().unwrap();

        assert!(!ledger.has_baseline_marker().unwrap());
        ledger
            .add_baseline_marker(MigrationVersion::parse("3").unwrap(), "<< Cassandra Baseline >>", "ops")
            .unwrap();
        assert!(ledger.has_baseline_marker().unwrap());
        assert!(!ledger.has_applied().unwrap());

        let marker = ledger.baseline_marker().unwrap().unwrap();
        assert_eq!(marker.migration_type, MigrationType::Baseline);
        assert_eq!(marker.checksum, None);
        assert_eq!(marker.installed_by, "ops");

        ledger.insert(applied("4")).unwrap();
        assert!(ledger.has_applied().unwrap());
        assert_eq!(ledger.find_applied(Some(MigrationType::Cql)).unwrap().len(), 1);
    }
}
