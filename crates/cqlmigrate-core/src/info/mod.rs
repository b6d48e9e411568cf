//! Reconciliation of resolved and applied migrations.
//!
//! Every version found in either the resolved set or the ledger becomes one
//! [`MigrationInfo`] with a [`MigrationState`]. The classification is
//! recomputed from scratch on each [`MigrationInfoService::refresh`].

mod service;
mod state;

pub use service::MigrationInfoService;
pub use state::MigrationState;

use crate::ledger::AppliedMigration;
use crate::resolver::{MigrationType, ResolvedMigration};
use crate::version::MigrationVersion;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

static EMPTY_VERSION: MigrationVersion = MigrationVersion::EMPTY;

/// Inputs shared by every classification in one pass.
#[derive(Debug, Clone)]
pub(crate) struct Context {
    pub(crate) allow_out_of_order: bool,
    /// Highest version a migrate run may reach.
    pub(crate) ceiling: MigrationVersion,
    /// Highest version in the ledger.
    pub(crate) last_applied: MigrationVersion,
    /// Baseline marker version, `EMPTY` without one.
    pub(crate) baseline: MigrationVersion,
    /// Highest locally resolved version.
    pub(crate) last_resolved: MigrationVersion,
    /// Applied versions installed after a higher version.
    pub(crate) applied_out_of_order: BTreeSet<MigrationVersion>,
}

impl Context {
    /// Applied versions whose row was installed after the row of some higher
    /// version.
    pub(crate) fn out_of_order_versions(applied: &[AppliedMigration]) -> BTreeSet<MigrationVersion> {
        let mut rows: Vec<&AppliedMigration> = applied.iter().collect();
        rows.sort_by(|a, b| b.version.cmp(&a.version));

        let mut earliest_higher: Option<i32> = None;
        let mut versions = BTreeSet::new();
        for row in rows {
            if earliest_higher.is_some_and(|rank| rank < row.installed_rank) {
                versions.insert(row.version.clone());
            }
            earliest_higher = Some(earliest_higher.map_or(row.installed_rank, |rank| {
                rank.min(row.installed_rank)
            }));
        }
        versions
    }
}

/// Resolved and applied views of one version.
#[derive(Debug, Clone)]
pub struct MigrationInfo {
    resolved: Option<ResolvedMigration>,
    applied: Option<AppliedMigration>,
    state: MigrationState,
    baseline: MigrationVersion,
}

impl MigrationInfo {
    /// Pair the two views of a version. At least one must be present.
    pub(crate) fn new(
        resolved: Option<ResolvedMigration>,
        applied: Option<AppliedMigration>,
        context: &Context,
    ) -> Option<Self> {
        let state = classify(resolved.as_ref(), applied.as_ref(), context)?;
        Some(Self {
            resolved,
            applied,
            state,
            baseline: context.baseline.clone(),
        })
    }

    /// The reconciled state.
    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// The local candidate, if resolved.
    pub fn resolved(&self) -> Option<&ResolvedMigration> {
        self.resolved.as_ref()
    }

    /// The ledger row, if applied.
    pub fn applied(&self) -> Option<&AppliedMigration> {
        self.applied.as_ref()
    }

    /// The version. The ledger's view wins when both exist.
    pub fn version(&self) -> &MigrationVersion {
        match (&self.applied, &self.resolved) {
            (Some(a), _) => &a.version,
            (None, Some(r)) => &r.version,
            (None, None) => &EMPTY_VERSION,
        }
    }

    /// The description.
    pub fn description(&self) -> &str {
        match (&self.applied, &self.resolved) {
            (Some(a), _) => &a.description,
            (None, Some(r)) => &r.description,
            (None, None) => "",
        }
    }

    /// The migration type.
    pub fn migration_type(&self) -> Option<MigrationType> {
        self.applied
            .as_ref()
            .map(|a| a.migration_type)
            .or_else(|| self.resolved.as_ref().map(|r| r.migration_type))
    }

    /// Script name.
    pub fn script(&self) -> &str {
        match (&self.applied, &self.resolved) {
            (Some(a), _) => &a.script,
            (None, Some(r)) => &r.script,
            (None, None) => "",
        }
    }

    /// Checksum.
    pub fn checksum(&self) -> Option<i32> {
        match (&self.applied, &self.resolved) {
            (Some(a), _) => a.checksum,
            (None, Some(r)) => r.checksum,
            (None, None) => None,
        }
    }

    /// When it was applied.
    pub fn installed_on(&self) -> Option<DateTime<Utc>> {
        self.applied.as_ref().map(|a| a.installed_on)
    }

    /// Execution time in milliseconds, when applied.
    pub fn execution_time(&self) -> Option<i64> {
        self.applied.as_ref().map(|a| a.execution_time)
    }

    /// Check the applied row against the local candidate.
    ///
    /// Versions at or below the baseline are not checked.
    pub fn validate(&self) -> Option<String> {
        if self.version() <= &self.baseline {
            return None;
        }

        if matches!(self.state, MigrationState::Missing | MigrationState::Future) {
            return Some(format!(
                "Detected applied migration not resolved locally: {}",
                self.version()
            ));
        }

        let (Some(resolved), Some(applied)) = (&self.resolved, &self.applied) else {
            return None;
        };
        if !matches!(
            self.state,
            MigrationState::Applied | MigrationState::OutOfOrder
        ) {
            return None;
        }

        if resolved.migration_type != applied.migration_type {
            return Some(mismatch(
                "Type",
                &applied.version,
                applied.migration_type,
                resolved.migration_type,
            ));
        }
        if resolved.checksum != applied.checksum {
            return Some(mismatch(
                "Checksum",
                &applied.version,
                format_checksum(applied.checksum),
                format_checksum(resolved.checksum),
            ));
        }
        if resolved.description != applied.description {
            return Some(mismatch(
                "Description",
                &applied.version,
                &applied.description,
                &resolved.description,
            ));
        }
        None
    }
}

fn format_checksum(checksum: Option<i32>) -> String {
    checksum.map_or_else(|| "null".to_string(), |c| c.to_string())
}

fn mismatch(
    what: &str,
    version: &MigrationVersion,
    applied: impl std::fmt::Display,
    resolved: impl std::fmt::Display,
) -> String {
    format!(
        "Migration {what} mismatch for migration {version}\n-> Applied to database : {applied}\n-> Resolved locally    : {resolved}"
    )
}

fn classify(
    resolved: Option<&ResolvedMigration>,
    applied: Option<&AppliedMigration>,
    context: &Context,
) -> Option<MigrationState> {
    let state = match (resolved, applied) {
        (None, None) => return None,
        (Some(r), None) => {
            if r.version < context.baseline {
                MigrationState::BelowBaseline
            } else if r.version > context.ceiling {
                MigrationState::AboveTarget
            } else if r.version < context.last_applied {
                if context.allow_out_of_order {
                    MigrationState::OutOfOrderPending
                } else {
                    MigrationState::OutOfOrderBlocked
                }
            } else {
                MigrationState::Pending
            }
        }
        (None, Some(a)) => {
            let future = a.version > context.last_resolved;
            match (a.migration_type == MigrationType::Baseline, a.success, future) {
                (true, _, _) => MigrationState::Baseline,
                (false, true, true) => MigrationState::Future,
                (false, false, true) => MigrationState::FutureFailed,
                (false, true, false) => MigrationState::Missing,
                (false, false, false) => MigrationState::Failed,
            }
        }
        (Some(_), Some(a)) => {
            if a.migration_type == MigrationType::Baseline {
                MigrationState::Baseline
            } else if a.success && context.applied_out_of_order.contains(&a.version) {
                MigrationState::OutOfOrder
            } else if a.success {
                MigrationState::Applied
            } else {
                MigrationState::Failed
            }
        }
    };
    Some(state)
}
