//! The database session collaborator.
//!
//! Everything the engine needs from a cluster goes through [`Session`]: raw
//! statement execution for migration scripts, topology for choosing a
//! consistency level, and a handful of row/counter primitives the applied
//! ledger is built on. A network driver for a real cluster implements this
//! trait; [`embedded`] provides a single-node sled-backed keyspace.

pub mod embedded;

use crate::error::Error;
use chrono::{DateTime, Utc};
use std::str::FromStr;

pub use embedded::{EmbeddedCluster, EmbeddedSession};

/// A row as a map of column name to value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Errors surfaced by a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The statement was rejected (unknown table, bad syntax, ...).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The keyspace does not exist.
    #[error("keyspace '{0}' does not exist")]
    KeyspaceNotFound(String),

    /// Not enough replicas answered for the requested consistency.
    #[error("unavailable at consistency {consistency}: {message}")]
    Unavailable {
        /// The requested consistency.
        consistency: Consistency,
        /// Driver detail.
        message: String,
    },

    /// The request timed out at the driver level.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Storage layer failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sled::Error> for SessionError {
    fn from(e: sled::Error) -> Self {
        SessionError::Storage(e.to_string())
    }
}

/// Replica acknowledgement level for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Consistency {
    /// A single replica.
    One,
    /// A majority of replicas.
    Quorum,
    /// Every replica.
    All,
}

impl Consistency {
    /// The level the ledger uses for a cluster of `host_count` nodes.
    ///
    /// Multi-node clusters get `All`. A single node runs at `One` so local and
    /// development clusters stay usable.
    pub fn for_topology(host_count: usize) -> Self {
        if host_count > 1 {
            Consistency::All
        } else {
            Consistency::One
        }
    }
}

impl FromStr for Consistency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ONE" => Ok(Consistency::One),
            "QUORUM" => Ok(Consistency::Quorum),
            "ALL" => Ok(Consistency::All),
            _ => Err(Error::Config(format!(
                "unknown consistency level '{s}', expected ONE, QUORUM or ALL"
            ))),
        }
    }
}

impl std::fmt::Display for Consistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Consistency::One => write!(f, "ONE"),
            Consistency::Quorum => write!(f, "QUORUM"),
            Consistency::All => write!(f, "ALL"),
        }
    }
}

/// A node known to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// Node address.
    pub address: String,
    /// Data center name.
    pub datacenter: String,
}

/// Kind of table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Ordinary rows; writes upsert column values.
    Regular,
    /// Counter table: one `count` column per key, only incremented.
    Counter,
}

/// Definition of a table the engine provisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Unqualified table name.
    pub name: String,
    /// Name of the primary key column.
    pub primary_key: String,
    /// Regular or counter table.
    pub kind: TableKind,
}

impl TableSpec {
    /// A regular table keyed by `primary_key`.
    pub fn regular(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            kind: TableKind::Regular,
        }
    }

    /// A counter table keyed by `primary_key`.
    pub fn counter(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            kind: TableKind::Counter,
        }
    }
}

/// A live connection to one keyspace.
///
/// All calls block the caller until the cluster answers.
pub trait Session {
    /// The keyspace this session is bound to.
    fn keyspace(&self) -> &str;

    /// Nodes currently known to the session.
    fn hosts(&self) -> Result<Vec<Host>, SessionError>;

    /// Execute one CQL statement.
    fn execute(&self, statement: &str, consistency: Consistency) -> Result<(), SessionError>;

    /// Create a table if it does not already exist.
    fn create_table(&self, spec: &TableSpec, consistency: Consistency)
        -> Result<(), SessionError>;

    /// Read rows from a table, at most `limit` when given.
    ///
    /// Fails with [`SessionError::InvalidQuery`] when the table does not exist.
    fn select(
        &self,
        table: &str,
        limit: Option<usize>,
        consistency: Consistency,
    ) -> Result<Vec<Row>, SessionError>;

    /// Atomically add `delta` to the named counter and return the new value.
    fn increment_counter(
        &self,
        table: &str,
        key: &str,
        delta: i64,
        consistency: Consistency,
    ) -> Result<i64, SessionError>;

    /// Upsert rows as one batch. Columns absent from a row keep their values.
    fn batch_upsert(
        &self,
        table: &str,
        rows: Vec<Row>,
        consistency: Consistency,
    ) -> Result<(), SessionError>;

    /// The server clock, used for ledger timestamps.
    fn now(&self) -> Result<DateTime<Utc>, SessionError> {
        Ok(Utc::now())
    }
}

/// Session wrappers for tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Delegates to an embedded session while reporting a fixed number of
    /// hosts and recording the consistency of every call.
    pub(crate) struct RecordingSession {
        pub(crate) inner: EmbeddedSession,
        pub(crate) host_count: usize,
        pub(crate) seen: Mutex<Vec<Consistency>>,
    }

    impl RecordingSession {
        pub(crate) fn new(inner: EmbeddedSession, host_count: usize) -> Self {
            Self {
                inner,
                host_count,
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn seen(&self) -> Vec<Consistency> {
            self.seen.lock().unwrap().clone()
        }

        fn record(&self, consistency: Consistency) {
            self.seen.lock().unwrap().push(consistency);
        }
    }

    impl Session for RecordingSession {
        fn keyspace(&self) -> &str {
            self.inner.keyspace()
        }

        fn hosts(&self) -> Result<Vec<Host>, SessionError> {
            Ok((0..self.host_count)
                .map(|i| Host {
                    address: format!("10.0.0.{}", i + 1),
                    datacenter: "dc1".to_string(),
                })
                .collect())
        }

        fn execute(&self, statement: &str, consistency: Consistency) -> Result<(), SessionError> {
            self.record(consistency);
            self.inner.execute(statement, consistency)
        }

        fn create_table(
            &self,
            spec: &TableSpec,
            consistency: Consistency,
        ) -> Result<(), SessionError> {
            self.record(consistency);
            self.inner.create_table(spec, consistency)
        }

        fn select(
            &self,
            table: &str,
            limit: Option<usize>,
            consistency: Consistency,
        ) -> Result<Vec<Row>, SessionError> {
            self.record(consistency);
            self.inner.select(table, limit, consistency)
        }

        fn increment_counter(
            &self,
            table: &str,
            key: &str,
            delta: i64,
            consistency: Consistency,
        ) -> Result<i64, SessionError> {
            self.record(consistency);
            self.inner.increment_counter(table, key, delta, consistency)
        }

        fn batch_upsert(
            &self,
            table: &str,
            rows: Vec<Row>,
            consistency: Consistency,
        ) -> Result<(), SessionError> {
            self.record(consistency);
            self.inner.batch_upsert(table, rows, consistency)
        }
    }
}
