//! Applied ledger rows.

use crate::error::{Error, Result};
use crate::resolver::MigrationType;
use crate::session::Row;
use crate::version::MigrationVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A migration recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    /// Position in version order at the last write.
    pub version_rank: i32,
    /// Position in application order.
    pub installed_rank: i32,
    /// The applied version.
    pub version: MigrationVersion,
    /// Description at application time.
    pub description: String,
    /// Kind of migration.
    #[serde(rename = "type")]
    pub migration_type: MigrationType,
    /// Script name or unit path.
    pub script: String,
    /// Checksum at application time.
    pub checksum: Option<i32>,
    /// Who applied it.
    pub installed_by: String,
    /// When it was recorded, by the server clock.
    pub installed_on: DateTime<Utc>,
    /// Execution time in milliseconds.
    pub execution_time: i64,
    /// Whether it succeeded.
    pub success: bool,
}

impl AppliedMigration {
    /// A record about to be inserted. Ranks and `installed_on` are assigned
    /// by the ledger.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: MigrationVersion,
        description: impl Into<String>,
        migration_type: MigrationType,
        script: impl Into<String>,
        checksum: Option<i32>,
        installed_by: impl Into<String>,
        execution_time: i64,
        success: bool,
    ) -> Self {
        Self {
            version_rank: 0,
            installed_rank: 0,
            version,
            description: description.into(),
            migration_type,
            script: script.into(),
            checksum,
            installed_by: installed_by.into(),
            installed_on: Utc::now(),
            execution_time,
            success,
        }
    }

    /// Ledger key of this record.
    pub fn key(&self) -> String {
        self.version.to_string()
    }

    /// Encode as a ledger row.
    pub fn to_row(&self) -> Result<Row> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(row) => Ok(row),
            other => Err(Error::Serialization(format!(
                "applied migration encoded as {other}"
            ))),
        }
    }

    /// Decode a ledger row.
    pub fn from_row(row: Row) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(row))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_columns() {
        let applied = AppliedMigration::new(
            MigrationVersion::parse("1.1").unwrap(),
            "Add users",
            MigrationType::Cql,
            "V1_1__Add_users.cql",
            Some(-12),
            "deployer",
            15,
            true,
        );
        let row = applied.to_row().unwrap();
        assert_eq!(row["version"], "1.1");
        assert_eq!(row["type"], "CQL");
        assert_eq!(row["checksum"], -12);
        assert_eq!(row["success"], true);
        assert!(row.contains_key("installed_on"));

        assert_eq!(AppliedMigration::from_row(row).unwrap(), applied);
    }

    #[test]
    fn test_null_checksum() {
        let applied = AppliedMigration::new(
            MigrationVersion::parse("2").unwrap(),
            "<< Cassandra Baseline >>",
            MigrationType::Baseline,
            "<< Cassandra Baseline >>",
            None,
            "",
            0,
            true,
        );
        let row = applied.to_row().unwrap();
        assert!(row["checksum"].is_null());
        assert_eq!(AppliedMigration::from_row(row).unwrap().checksum, None);
    }

    #[test]
    fn test_corrupt_row() {
        let mut row = Row::new();
        row.insert("version".to_string(), "1..2".into());
        assert!(AppliedMigration::from_row(row).is_err());
    }
}
