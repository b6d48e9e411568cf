//! CQL scripts.
//!
//! A script is split into statements on `;`. Delimiters inside quoted
//! literals, `$$` bodies and comments do not end a statement, chunks holding
//! only comments are dropped, and a final statement without a delimiter is
//! kept.

mod parser;

use crate::session::{Consistency, Session, SessionError};
use tracing::debug;

/// A parsed CQL script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CqlScript {
    statements: Vec<String>,
}

impl CqlScript {
    /// Parse script source into statements.
    pub fn parse(source: &str) -> Self {
        let statements = parser::split_statements(source);
        for statement in &statements {
            debug!(statement = %statement, "found statement");
        }
        Self { statements }
    }

    /// The statements in script order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Execute every statement in order, stopping at the first failure.
    pub fn execute(
        &self,
        session: &dyn Session,
        consistency: Consistency,
    ) -> Result<(), SessionError> {
        for statement in &self.statements {
            debug!(statement = %statement, "executing CQL");
            session.execute(statement, consistency)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::EmbeddedCluster;

    #[test]
    fn test_execute_stops_at_first_failure() {
        let cluster = EmbeddedCluster::temporary().unwrap();
        cluster.create_keyspace("ks").unwrap();
        let session = cluster.connect("ks").unwrap();

        let script = CqlScript::parse(
            "CREATE TABLE a (id int PRIMARY KEY);\nINSERT INTO missing (id) VALUES (1);\nCREATE TABLE b (id int PRIMARY KEY);",
        );
        assert_eq!(script.statements().len(), 3);

        assert!(script.execute(&session, Consistency::One).is_err());
        assert!(session.table_exists("a").unwrap());
        assert!(!session.table_exists("b").unwrap());
    }

    #[test]
    fn test_empty_script() {
        let script = CqlScript::parse("-- nothing to do\n\n");
        assert!(script.statements().is_empty());
    }
}
