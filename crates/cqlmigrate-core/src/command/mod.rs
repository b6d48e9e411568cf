//! Migrate, validate and baseline commands.
//!
//! Each command borrows a resolver and a ledger for one run. The
//! [`Migrator`](crate::Migrator) facade wires them from a configuration.

mod baseline;
mod migrate;
mod validate;

pub use baseline::Baseline;
pub use migrate::Migrate;
pub use validate::Validate;
