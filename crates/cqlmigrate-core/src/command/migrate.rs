//! The migrate command.

use crate::error::{Error, Result};
use crate::info::MigrationInfoService;
use crate::ledger::{AppliedLedger, AppliedMigration};
use crate::resolver::MigrationResolver;
use crate::session::Session;
use crate::version::{MigrationVersion, Target};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Applies pending migrations in version order.
pub struct Migrate<'a> {
    resolver: &'a dyn MigrationResolver,
    ledger: &'a AppliedLedger<'a>,
    session: &'a dyn Session,
    target: Target,
    allow_out_of_order: bool,
    user: String,
}

impl<'a> Migrate<'a> {
    /// Create the command.
    pub fn new(
        resolver: &'a dyn MigrationResolver,
        ledger: &'a AppliedLedger<'a>,
        session: &'a dyn Session,
        target: Target,
        allow_out_of_order: bool,
        user: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            ledger,
            session,
            target,
            allow_out_of_order,
            user: user.into(),
        }
    }

    /// Apply every runnable migration up to the target, one at a time.
    ///
    /// Stops at the first failure. Migrations applied before it stay
    /// recorded; the failing one is not recorded and nothing after it runs.
    /// Returns the number of migrations applied.
    pub fn run(&self) -> Result<usize> {
        let started = Instant::now();
        let keyspace = self.session.keyspace();
        self.ledger.ensure_schema()?;

        let mut service = MigrationInfoService::new(
            self.resolver,
            self.ledger,
            self.target.clone(),
            self.allow_out_of_order,
        );
        service.refresh()?;

        let current = service
            .current()
            .map(|i| i.version().clone())
            .unwrap_or(MigrationVersion::EMPTY);
        info!(keyspace, version = %current, "current version of keyspace");
        if self.allow_out_of_order {
            warn!(
                keyspace,
                "out-of-order mode is active, migration of keyspace may not be reproducible"
            );
        }

        if !service.future().is_empty() {
            match service.resolved().last() {
                Some(latest) => warn!(
                    keyspace,
                    version = %current,
                    latest = %latest.version(),
                    "keyspace is newer than the latest available migration"
                ),
                None => warn!(
                    keyspace,
                    version = %current,
                    "keyspace has a version but no migration could be resolved in the configured locations"
                ),
            }
        }

        if let Some(failed) = service.failed().first() {
            return Err(Error::Execution {
                version: failed.version().clone(),
                message: format!("keyspace {keyspace} contains a failed migration"),
            });
        }

        let mut applied = 0;
        for pending in service.pending() {
            let Some(migration) = pending.resolved() else {
                continue;
            };
            let out_of_order = migration.version < current;
            info!(
                keyspace,
                version = %migration.version,
                description = %migration.description,
                out_of_order,
                "migrating keyspace"
            );

            let step = Instant::now();
            if let Err(e) = migration.executor.execute(self.session) {
                error!(
                    keyspace,
                    version = %migration.version,
                    error = %e,
                    "migration failed, restore backups and roll back database and code"
                );
                return Err(Error::Execution {
                    version: migration.version.clone(),
                    message: e.to_string(),
                });
            }
            let elapsed_ms = i64::try_from(step.elapsed().as_millis()).unwrap_or(i64::MAX);

            self.ledger.insert(AppliedMigration::new(
                migration.version.clone(),
                migration.description.clone(),
                migration.migration_type,
                migration.script.clone(),
                migration.checksum,
                self.user.clone(),
                elapsed_ms,
                true,
            ))?;
            debug!(version = %migration.version, elapsed_ms, "migration succeeded");
            applied += 1;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if applied == 0 {
            info!(keyspace, elapsed_ms, "keyspace is up to date, no migration necessary");
        } else {
            info!(keyspace, count = applied, elapsed_ms, "successfully applied migration(s)");
        }
        Ok(applied)
    }
}
