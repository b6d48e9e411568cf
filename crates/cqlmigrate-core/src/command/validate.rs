//! The validate command.

use crate::error::Result;
use crate::info::MigrationInfoService;
use crate::ledger::AppliedLedger;
use crate::resolver::MigrationResolver;
use crate::version::Target;
use std::time::Instant;
use tracing::info;

/// Compares the ledger with the local candidates without changing anything.
pub struct Validate<'a> {
    resolver: &'a dyn MigrationResolver,
    ledger: &'a AppliedLedger<'a>,
    target: Target,
    allow_out_of_order: bool,
}

impl<'a> Validate<'a> {
    /// Create the command.
    pub fn new(
        resolver: &'a dyn MigrationResolver,
        ledger: &'a AppliedLedger<'a>,
        target: Target,
        allow_out_of_order: bool,
    ) -> Self {
        Self {
            resolver,
            ledger,
            target,
            allow_out_of_order,
        }
    }

    /// Returns the first disagreement found, or `None` when consistent.
    pub fn run(&self) -> Result<Option<String>> {
        let started = Instant::now();
        let mut service = MigrationInfoService::new(
            self.resolver,
            self.ledger,
            self.target.clone(),
            self.allow_out_of_order,
        );
        service.refresh()?;

        let count = service.all().len();
        let message = service.validate();
        info!(
            count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "validated migrations"
        );
        Ok(message)
    }
}
