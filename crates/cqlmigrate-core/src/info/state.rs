//! Per-version reconciliation state.

use serde::Serialize;
use std::fmt;

/// Where a version stands after reconciling resolved and applied migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationState {
    /// Resolved, not applied, and due to run.
    Pending,
    /// Resolved below the highest applied version while out-of-order
    /// application is disallowed. Reported, never run.
    OutOfOrderBlocked,
    /// Resolved below the highest applied version with out-of-order
    /// application allowed. Runs like a pending migration.
    OutOfOrderPending,
    /// Resolved and successfully applied.
    Applied,
    /// Applied after a higher version had already been installed.
    OutOfOrder,
    /// Applied, not resolved locally, below the highest local version.
    Missing,
    /// Applied, not resolved locally, above every local version.
    Future,
    /// Recorded as failed, not resolved locally, above every local version.
    FutureFailed,
    /// The baseline marker.
    Baseline,
    /// Resolved above the target ceiling. Left alone.
    AboveTarget,
    /// Resolved below the baseline version. Never run.
    BelowBaseline,
    /// Recorded as failed in the ledger.
    Failed,
}

impl MigrationState {
    /// Label used in info listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            MigrationState::Pending => "Pending",
            MigrationState::OutOfOrderBlocked => "Ignored",
            MigrationState::OutOfOrderPending => "Pending Out of Order",
            MigrationState::Applied => "Success",
            MigrationState::OutOfOrder => "Out of Order",
            MigrationState::Missing => "Missing",
            MigrationState::Future => "Future",
            MigrationState::FutureFailed => "Future Failed",
            MigrationState::Baseline => "Baseline",
            MigrationState::AboveTarget => "Above Target",
            MigrationState::BelowBaseline => "Below Baseline",
            MigrationState::Failed => "Failed",
        }
    }

    /// Whether a local candidate exists for this state.
    pub fn is_resolved(&self) -> bool {
        !matches!(
            self,
            MigrationState::Missing | MigrationState::Future | MigrationState::FutureFailed
        )
    }

    /// Whether the ledger holds a row for this state.
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            MigrationState::Applied
                | MigrationState::OutOfOrder
                | MigrationState::Missing
                | MigrationState::Future
                | MigrationState::FutureFailed
                | MigrationState::Baseline
                | MigrationState::Failed
        )
    }

    /// Whether the ledger records a failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, MigrationState::Failed | MigrationState::FutureFailed)
    }

    /// Whether a migrate run executes migrations in this state.
    pub fn is_runnable(&self) -> bool {
        matches!(
            self,
            MigrationState::Pending | MigrationState::OutOfOrderPending
        )
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
