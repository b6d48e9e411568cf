//! Core error types.

use crate::session::SessionError;
use crate::version::{MigrationVersion, VersionFormatError};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by resolution, ledger access and the migration commands.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed version string.
    #[error(transparent)]
    Format(#[from] VersionFormatError),

    /// A discovered script or unit name does not follow the naming grammar.
    #[error("wrong migration name format: {name} (it should look like this: {suggestion})")]
    Naming {
        /// The offending name.
        name: String,
        /// An example of a valid name.
        suggestion: String,
    },

    /// Two resolved migrations share a version but differ in content.
    #[error(
        "found more than one migration with version {version}\nOffenders:\n-> {first}\n-> {second}"
    )]
    Conflict {
        /// The shared version.
        version: MigrationVersion,
        /// Physical location of the first candidate.
        first: String,
        /// Physical location of the second candidate.
        second: String,
    },

    /// Empty or unusable location.
    #[error("invalid location '{descriptor}': {reason}")]
    Location {
        /// The location descriptor as configured.
        descriptor: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Cluster unreachable or keyspace absent.
    #[error("unable to establish session: {0}")]
    Connection(String),

    /// Applied and resolved migrations disagree.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A migration failed while executing.
    #[error("migration {version} failed: {message}")]
    Execution {
        /// The version that failed.
        version: MigrationVersion,
        /// Failure detail from the executor.
        message: String,
    },

    /// Baseline requested against a ledger that already holds migrations.
    #[error("baseline rejected: {0}")]
    Baseline(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage or driver failure outside script execution.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// IO error while reading migration sources.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A ledger row could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
