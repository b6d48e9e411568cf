//! cqlmigrate core - versioned schema migrations for wide-column keyspaces.
//!
//! This crate resolves migration candidates from script locations and
//! procedural units, orders them by version, reconciles them against the
//! applied ledger stored in the keyspace itself, and applies what is pending.
//!
//! # Example
//!
//! ```ignore
//! use cqlmigrate_core::{EmbeddedCluster, MigrationConfig, Migrator};
//!
//! let cluster = EmbeddedCluster::open("./data")?;
//! cluster.create_keyspace("app")?;
//! let session = cluster.connect("app")?;
//!
//! let config = MigrationConfig::new("app").with_locations(["filesystem:db/migration"]);
//! let migrator = Migrator::new(config)?;
//! let applied = migrator.migrate(&session)?;
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod info;
pub mod ledger;
pub mod location;
pub mod migrator;
pub mod resolver;
pub mod script;
pub mod session;
pub mod version;

pub use config::MigrationConfig;
pub use error::{Error, Result};
pub use info::{MigrationInfo, MigrationInfoService, MigrationState};
pub use ledger::{AppliedLedger, AppliedMigration};
pub use location::{ScriptsLocation, ScriptsLocations};
pub use migrator::Migrator;
pub use resolver::{
    CompositeResolver, CqlMigrationResolver, MigrationRegistry, MigrationResolver,
    MigrationType, ProceduralMigration, ProceduralMigrationResolver, ResolvedMigration,
};
pub use script::CqlScript;
pub use session::{Consistency, EmbeddedCluster, EmbeddedSession, Session, SessionError};
pub use version::{MigrationVersion, Target, VersionFormatError};
