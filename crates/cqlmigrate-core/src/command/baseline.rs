//! The baseline command.

use crate::error::{Error, Result};
use crate::ledger::AppliedLedger;
use crate::version::MigrationVersion;
use tracing::info;

/// Marks an existing keyspace as being at a given version.
pub struct Baseline<'a> {
    ledger: &'a AppliedLedger<'a>,
    version: MigrationVersion,
    description: String,
    user: String,
}

impl<'a> Baseline<'a> {
    /// Create the command.
    pub fn new(
        ledger: &'a AppliedLedger<'a>,
        version: MigrationVersion,
        description: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            version,
            description: description.into(),
            user: user.into(),
        }
    }

    /// Insert the baseline marker.
    ///
    /// Fails if the ledger already holds migrations. Re-running with the
    /// version and description of an existing marker does nothing; any other
    /// values fail.
    pub fn run(&self) -> Result<()> {
        self.ledger.ensure_schema()?;
        let table = self.ledger.table_name();

        if self.ledger.has_applied()? {
            return Err(Error::Baseline(format!(
                "unable to baseline ledger table {table} as it already contains migrations"
            )));
        }

        if let Some(marker) = self.ledger.baseline_marker()? {
            if marker.version != self.version || marker.description != self.description {
                return Err(Error::Baseline(format!(
                    "unable to baseline ledger table {table} with ({}, {}) as it has already been initialized with ({}, {})",
                    self.version, self.description, marker.version, marker.description
                )));
            }
            info!(version = %self.version, "baseline marker already present");
            return Ok(());
        }

        self.ledger
            .add_baseline_marker(self.version.clone(), &self.description, &self.user)?;
        info!(
            table,
            version = %self.version,
            "successfully baselined keyspace"
        );
        Ok(())
    }
}
