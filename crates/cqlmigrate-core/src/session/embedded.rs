//! Embedded single-node keyspace backed by sled.
//!
//! Each table is a sled tree named `data:<keyspace>.<table>`; the table
//! catalog and keyspace list live in `system_schema:*` trees. Regular rows are
//! stored as JSON keyed by their primary key value, counters as big-endian
//! `i64`. CQL statements are checked for a known leading verb, `CREATE TABLE`,
//! `DROP TABLE` and `CREATE KEYSPACE` update the catalog, statements touching
//! a table require it to exist, and every accepted statement is journaled.

use super::{Consistency, Host, Row, Session, SessionError, TableKind, TableSpec};
use serde::{Deserialize, Serialize};
use sled::{Batch, Db, Tree};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Tree holding known keyspace names.
const KEYSPACES_TREE: &str = "system_schema:keyspaces";

/// Tree holding `<keyspace>.<table>` -> table metadata.
const TABLES_TREE: &str = "system_schema:tables";

/// Prefix of per-table data trees.
const DATA_PREFIX: &str = "data:";

/// Prefix of per-keyspace statement journals.
const JOURNAL_PREFIX: &str = "journal:";

/// Column holding a counter's value in rows returned by `select`.
const COUNT_COLUMN: &str = "count";

/// Statement verbs accepted without further inspection.
const PASSTHROUGH_VERBS: &[&str] = &[
    "BEGIN", "APPLY", "USE", "GRANT", "REVOKE", "LIST",
];

/// Object kinds that `CREATE`/`DROP`/`ALTER` may name besides tables and keyspaces.
const SCHEMA_OBJECTS: &[&str] = &[
    "INDEX",
    "CUSTOM",
    "TYPE",
    "MATERIALIZED",
    "FUNCTION",
    "OR",
    "AGGREGATE",
    "TRIGGER",
    "ROLE",
    "USER",
];

#[derive(Debug, Serialize, Deserialize)]
struct TableMeta {
    primary_key: String,
    counter: bool,
}

/// A single-node cluster stored in one sled database.
pub struct EmbeddedCluster {
    db: Db,
}

impl EmbeddedCluster {
    /// Open or create a cluster at the given directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Create a cluster that is discarded when dropped.
    pub fn temporary() -> Result<Self, SessionError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Create a keyspace. Returns `false` if it already existed.
    pub fn create_keyspace(&self, name: &str) -> Result<bool, SessionError> {
        let name = normalize_identifier(name);
        let keyspaces = self.db.open_tree(KEYSPACES_TREE)?;
        let previous = keyspaces.insert(name.as_bytes(), Vec::<u8>::new())?;
        Ok(previous.is_none())
    }

    /// Whether a keyspace exists.
    pub fn keyspace_exists(&self, name: &str) -> Result<bool, SessionError> {
        let keyspaces = self.db.open_tree(KEYSPACES_TREE)?;
        Ok(keyspaces.contains_key(normalize_identifier(name).as_bytes())?)
    }

    /// Open a session bound to an existing keyspace.
    pub fn connect(&self, keyspace: &str) -> Result<EmbeddedSession, SessionError> {
        let keyspace = normalize_identifier(keyspace);
        if !self.keyspace_exists(&keyspace)? {
            return Err(SessionError::KeyspaceNotFound(keyspace));
        }

        let tables = self.db.open_tree(TABLES_TREE)?;
        let journal = self.db.open_tree(format!("{JOURNAL_PREFIX}{keyspace}"))?;
        Ok(EmbeddedSession {
            db: self.db.clone(),
            keyspace,
            tables,
            journal,
        })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), SessionError> {
        self.db.flush()?;
        Ok(())
    }
}

/// A session on an [`EmbeddedCluster`] keyspace.
pub struct EmbeddedSession {
    db: Db,
    keyspace: String,
    tables: Tree,
    journal: Tree,
}

impl EmbeddedSession {
    /// Whether a table exists in this session's keyspace (or a qualified name).
    pub fn table_exists(&self, name: &str) -> Result<bool, SessionError> {
        let key = self.qualify(name);
        Ok(self.tables.contains_key(key.as_bytes())?)
    }

    /// Statements executed so far in this keyspace, oldest first.
    pub fn journal(&self) -> Result<Vec<String>, SessionError> {
        let mut statements = Vec::new();
        for entry in self.journal.iter() {
            let (_, value) = entry?;
            statements.push(String::from_utf8_lossy(&value).into_owned());
        }
        Ok(statements)
    }

    /// Drop a table and its data. Returns `false` if it did not exist.
    pub fn drop_table(&self, name: &str) -> Result<bool, SessionError> {
        let key = self.qualify(name);
        let existed = self.tables.remove(key.as_bytes())?.is_some();
        if existed {
            self.db.drop_tree(format!("{DATA_PREFIX}{key}"))?;
        }
        Ok(existed)
    }

    fn qualify(&self, name: &str) -> String {
        let name = normalize_identifier(name);
        if name.contains('.') {
            name
        } else {
            format!("{}.{}", self.keyspace, name)
        }
    }

    fn table_meta(&self, qualified: &str) -> Result<TableMeta, SessionError> {
        match self.tables.get(qualified.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| SessionError::Storage(format!("corrupt table metadata: {e}"))),
            None => Err(SessionError::InvalidQuery(format!(
                "unconfigured table {qualified}"
            ))),
        }
    }

    fn data_tree(&self, qualified: &str) -> Result<Tree, SessionError> {
        Ok(self.db.open_tree(format!("{DATA_PREFIX}{qualified}"))?)
    }

    fn register_table(
        &self,
        qualified: &str,
        meta: &TableMeta,
        if_not_exists: bool,
    ) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec(meta)
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        let swapped = self
            .tables
            .compare_and_swap(qualified.as_bytes(), None as Option<&[u8]>, Some(bytes))?;
        if swapped.is_err() && !if_not_exists {
            return Err(SessionError::InvalidQuery(format!(
                "table {qualified} already exists"
            )));
        }
        Ok(())
    }

    fn record(&self, statement: &str) -> Result<(), SessionError> {
        let id = self.db.generate_id()?;
        self.journal.insert(id.to_be_bytes(), statement.as_bytes())?;
        Ok(())
    }

    fn require_table(&self, name: &str) -> Result<(), SessionError> {
        self.table_meta(&self.qualify(name)).map(|_| ())
    }

    fn execute_create(&self, tokens: &[&str], statement: &str) -> Result<(), SessionError> {
        let object = tokens.get(1).map(|t| t.to_ascii_uppercase()).unwrap_or_default();
        match object.as_str() {
            "TABLE" | "COLUMNFAMILY" => {
                let (if_not_exists, name) = object_name(tokens, 2)?;
                let qualified = self.qualify(&name);
                let primary_key = primary_key_column(statement).ok_or_else(|| {
                    SessionError::InvalidQuery(format!("no primary key defined for {qualified}"))
                })?;
                let counter = has_counter_column(statement);
                self.register_table(&qualified, &TableMeta { primary_key, counter }, if_not_exists)
            }
            "KEYSPACE" | "SCHEMA" => {
                let (if_not_exists, name) = object_name(tokens, 2)?;
                let keyspaces = self.db.open_tree(KEYSPACES_TREE)?;
                if keyspaces.insert(name.as_bytes(), Vec::<u8>::new())?.is_some() && !if_not_exists {
                    return Err(SessionError::InvalidQuery(format!(
                        "keyspace {name} already exists"
                    )));
                }
                Ok(())
            }
            other if SCHEMA_OBJECTS.contains(&other) => Ok(()),
            _ => Err(SessionError::InvalidQuery(format!(
                "cannot parse CREATE statement: {statement}"
            ))),
        }
    }

    fn execute_drop(&self, tokens: &[&str], statement: &str) -> Result<(), SessionError> {
        let object = tokens.get(1).map(|t| t.to_ascii_uppercase()).unwrap_or_default();
        match object.as_str() {
            "TABLE" | "COLUMNFAMILY" => {
                let if_exists = tokens
                    .get(2)
                    .is_some_and(|t| t.eq_ignore_ascii_case("IF"));
                let name_at = if if_exists { 4 } else { 2 };
                let name = tokens.get(name_at).ok_or_else(|| {
                    SessionError::InvalidQuery(format!("missing table name: {statement}"))
                })?;
                if !self.drop_table(&strip_name(name))? && !if_exists {
                    return Err(SessionError::InvalidQuery(format!(
                        "unconfigured table {}",
                        self.qualify(&strip_name(name))
                    )));
                }
                Ok(())
            }
            "KEYSPACE" | "SCHEMA" => Ok(()),
            other if SCHEMA_OBJECTS.contains(&other) => Ok(()),
            _ => Err(SessionError::InvalidQuery(format!(
                "cannot parse DROP statement: {statement}"
            ))),
        }
    }
}

impl Session for EmbeddedSession {
    fn keyspace(&self) -> &str {
        &self.keyspace
    }

    fn hosts(&self) -> Result<Vec<Host>, SessionError> {
        Ok(vec![Host {
            address: "127.0.0.1".to_string(),
            datacenter: "embedded".to_string(),
        }])
    }

    fn execute(&self, statement: &str, _consistency: Consistency) -> Result<(), SessionError> {
        let trimmed = statement.trim().trim_end_matches(';').trim();
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let verb = match tokens.first() {
            Some(verb) => verb.to_ascii_uppercase(),
            None => return Err(SessionError::InvalidQuery("empty statement".to_string())),
        };

        match verb.as_str() {
            "CREATE" => self.execute_create(&tokens, trimmed)?,
            "DROP" => self.execute_drop(&tokens, trimmed)?,
            "ALTER" => {
                let object = tokens.get(1).map(|t| t.to_ascii_uppercase());
                if matches!(object.as_deref(), Some("TABLE") | Some("COLUMNFAMILY")) {
                    let name = tokens.get(2).ok_or_else(|| {
                        SessionError::InvalidQuery(format!("missing table name: {trimmed}"))
                    })?;
                    self.require_table(&strip_name(name))?;
                }
            }
            "INSERT" => self.require_table(&token_after(&tokens, "INTO", trimmed)?)?,
            "DELETE" | "SELECT" => self.require_table(&token_after(&tokens, "FROM", trimmed)?)?,
            "UPDATE" => {
                let name = tokens.get(1).ok_or_else(|| {
                    SessionError::InvalidQuery(format!("missing table name: {trimmed}"))
                })?;
                self.require_table(&strip_name(name))?;
            }
            "TRUNCATE" => {
                let name_at = if tokens
                    .get(1)
                    .is_some_and(|t| t.eq_ignore_ascii_case("TABLE"))
                {
                    2
                } else {
                    1
                };
                let name = tokens.get(name_at).ok_or_else(|| {
                    SessionError::InvalidQuery(format!("missing table name: {trimmed}"))
                })?;
                let qualified = self.qualify(&strip_name(name));
                self.table_meta(&qualified)?;
                self.data_tree(&qualified)?.clear()?;
            }
            v if PASSTHROUGH_VERBS.contains(&v) => {}
            _ => {
                return Err(SessionError::InvalidQuery(format!(
                    "line 1: no viable alternative at input '{}'",
                    tokens[0]
                )))
            }
        }

        debug!(keyspace = %self.keyspace, statement = trimmed, "executed statement");
        self.record(trimmed)
    }

    fn create_table(
        &self,
        spec: &TableSpec,
        _consistency: Consistency,
    ) -> Result<(), SessionError> {
        let meta = TableMeta {
            primary_key: spec.primary_key.clone(),
            counter: spec.kind == TableKind::Counter,
        };
        self.register_table(&self.qualify(&spec.name), &meta, true)
    }

    fn select(
        &self,
        table: &str,
        limit: Option<usize>,
        _consistency: Consistency,
    ) -> Result<Vec<Row>, SessionError> {
        let qualified = self.qualify(table);
        let meta = self.table_meta(&qualified)?;
        let tree = self.data_tree(&qualified)?;

        let mut rows = Vec::new();
        for entry in tree.iter() {
            if limit.is_some_and(|l| rows.len() >= l) {
                break;
            }
            let (key, value) = entry?;
            let row = if meta.counter {
                let mut row = Row::new();
                row.insert(
                    meta.primary_key.clone(),
                    String::from_utf8_lossy(&key).into_owned().into(),
                );
                row.insert(COUNT_COLUMN.to_string(), decode_counter(&value).into());
                row
            } else {
                serde_json::from_slice(&value)
                    .map_err(|e| SessionError::Storage(format!("corrupt row in {qualified}: {e}")))?
            };
            rows.push(row);
        }
        Ok(rows)
    }

    fn increment_counter(
        &self,
        table: &str,
        key: &str,
        delta: i64,
        _consistency: Consistency,
    ) -> Result<i64, SessionError> {
        let qualified = self.qualify(table);
        let meta = self.table_meta(&qualified)?;
        if !meta.counter {
            return Err(SessionError::InvalidQuery(format!(
                "{qualified} is not a counter table"
            )));
        }

        let tree = self.data_tree(&qualified)?;
        let updated = tree.update_and_fetch(key.as_bytes(), |old| {
            let current = old.map(decode_counter).unwrap_or(0);
            Some((current + delta).to_be_bytes().to_vec())
        })?;
        Ok(updated.as_deref().map(decode_counter).unwrap_or(0))
    }

    fn batch_upsert(
        &self,
        table: &str,
        rows: Vec<Row>,
        _consistency: Consistency,
    ) -> Result<(), SessionError> {
        let qualified = self.qualify(table);
        let meta = self.table_meta(&qualified)?;
        if meta.counter {
            return Err(SessionError::InvalidQuery(format!(
                "cannot upsert into counter table {qualified}"
            )));
        }

        let tree = self.data_tree(&qualified)?;
        let mut merged: HashMap<String, Row> = HashMap::new();
        for row in rows {
            let key = match row.get(&meta.primary_key) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => {
                    return Err(SessionError::InvalidQuery(format!(
                        "missing primary key column {} for {qualified}",
                        meta.primary_key
                    )))
                }
                Some(other) => other.to_string(),
            };

            let mut entry = match merged.remove(&key) {
                Some(existing) => existing,
                None => match tree.get(key.as_bytes())? {
                    Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                        SessionError::Storage(format!("corrupt row in {qualified}: {e}"))
                    })?,
                    None => Row::new(),
                },
            };
            entry.extend(row);
            merged.insert(key, entry);
        }

        let mut batch = Batch::default();
        for (key, row) in &merged {
            let bytes = serde_json::to_vec(row).map_err(|e| SessionError::Storage(e.to_string()))?;
            batch.insert(key.as_bytes(), bytes);
        }
        tree.apply_batch(batch)?;
        Ok(())
    }
}

fn decode_counter(bytes: &[u8]) -> i64 {
    <[u8; 8]>::try_from(bytes)
        .map(i64::from_be_bytes)
        .unwrap_or(0)
}

/// Lowercase unquoted identifiers; keep quoted ones verbatim without quotes.
fn normalize_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| {
            if part.len() >= 2 && part.starts_with('"') && part.ends_with('"') {
                part[1..part.len() - 1].to_string()
            } else {
                part.to_ascii_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Strip a trailing column list or terminator from a name token.
fn strip_name(token: &str) -> String {
    let end = token.find(['(', ';']).unwrap_or(token.len());
    token[..end].to_string()
}

/// Parse `[IF NOT EXISTS] name` starting at `at`.
fn object_name(tokens: &[&str], at: usize) -> Result<(bool, String), SessionError> {
    let if_not_exists = tokens
        .get(at)
        .is_some_and(|t| t.eq_ignore_ascii_case("IF"));
    let name_at = if if_not_exists { at + 3 } else { at };
    let name = tokens
        .get(name_at)
        .map(|t| strip_name(t))
        .filter(|n| !n.is_empty())
        .ok_or_else(|| SessionError::InvalidQuery(format!("missing name in: {}", tokens.join(" "))))?;
    Ok((if_not_exists, normalize_identifier(&name)))
}

fn token_after(tokens: &[&str], keyword: &str, statement: &str) -> Result<String, SessionError> {
    tokens
        .iter()
        .position(|t| t.eq_ignore_ascii_case(keyword))
        .and_then(|i| tokens.get(i + 1))
        .map(|t| strip_name(t))
        .filter(|n| !n.is_empty())
        .ok_or_else(|| SessionError::InvalidQuery(format!("missing table name: {statement}")))
}

/// Whether a `CREATE TABLE` statement declares a column of type `counter`.
fn has_counter_column(statement: &str) -> bool {
    let Some(start) = statement.find('(') else {
        return false;
    };
    let end = statement.rfind(')').filter(|end| *end > start).unwrap_or(statement.len());
    statement[start + 1..end].split(',').any(|column_def| {
        column_def
            .split_whitespace()
            .nth(1)
            .map(|ty| ty.trim_end_matches(')'))
            .is_some_and(|ty| ty.eq_ignore_ascii_case("counter"))
    })
}

/// Find the first primary key column of a `CREATE TABLE` statement.
fn primary_key_column(statement: &str) -> Option<String> {
    let lower = statement.to_ascii_lowercase();
    let marker = lower.find("primary key")?;

    let after = lower[marker + "primary key".len()..].trim_start();
    if let Some(list) = after.strip_prefix('(') {
        // PRIMARY KEY (a, b) or PRIMARY KEY ((a, b), c)
        let first = list
            .trim_start_matches('(')
            .split([',', ')'])
            .next()?
            .trim();
        return (!first.is_empty()).then(|| normalize_identifier(first));
    }

    // Inline form: `<name> <type> PRIMARY KEY`.
    let before = &statement[..marker];
    let column_def = before.rsplit([',', '(']).next()?.trim();
    column_def
        .split_whitespace()
        .next()
        .map(normalize_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (EmbeddedCluster, EmbeddedSession) {
        let cluster = EmbeddedCluster::temporary().unwrap();
        cluster.create_keyspace("app").unwrap();
        let session = cluster.connect("app").unwrap();
        (cluster, session)
    }

    fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_connect_requires_keyspace() {
        let cluster = EmbeddedCluster::temporary().unwrap();
        assert!(matches!(
            cluster.connect("missing"),
            Err(SessionError::KeyspaceNotFound(_))
        ));
        assert!(cluster.create_keyspace("Missing").unwrap());
        assert!(!cluster.create_keyspace("missing").unwrap());
        assert!(cluster.connect("MISSING").is_ok());
    }

    #[test]
    fn test_create_and_drop_table_statements() {
        let (_cluster, session) = session();
        session
            .execute(
                "CREATE TABLE users (id uuid PRIMARY KEY, name text);",
                Consistency::One,
            )
            .unwrap();
        assert!(session.table_exists("users").unwrap());

        let err = session
            .execute("CREATE TABLE users (id uuid PRIMARY KEY)", Consistency::One)
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuery(_)));

        session
            .execute(
                "CREATE TABLE IF NOT EXISTS app.users (id uuid PRIMARY KEY)",
                Consistency::One,
            )
            .unwrap();

        session.execute("DROP TABLE users", Consistency::One).unwrap();
        assert!(!session.table_exists("users").unwrap());
        session
            .execute("DROP TABLE IF EXISTS users", Consistency::One)
            .unwrap();
        assert!(session.execute("DROP TABLE users", Consistency::One).is_err());
    }

    #[test]
    fn test_statements_require_existing_tables() {
        let (_cluster, session) = session();
        assert!(session
            .execute("INSERT INTO things (id) VALUES (1)", Consistency::One)
            .is_err());
        session
            .execute(
                "CREATE TABLE things (id int, at int, PRIMARY KEY ((id), at))",
                Consistency::One,
            )
            .unwrap();
        session
            .execute("INSERT INTO things (id, at) VALUES (1, 2)", Consistency::One)
            .unwrap();
        session
            .execute("ALTER TABLE things ADD note text", Consistency::One)
            .unwrap();
        session
            .execute("SELECT * FROM app.things", Consistency::One)
            .unwrap();
        assert_eq!(session.journal().unwrap().len(), 4);
    }

    #[test]
    fn test_unknown_verb_is_rejected() {
        let (_cluster, session) = session();
        let err = session
            .execute("CREAT TABLE oops (id int PRIMARY KEY)", Consistency::One)
            .unwrap_err();
        assert!(err.to_string().contains("CREAT"));
        assert!(session.execute("   ", Consistency::One).is_err());
        assert!(session.journal().unwrap().is_empty());
    }

    #[test]
    fn test_primary_key_column_forms() {
        assert_eq!(
            primary_key_column("CREATE TABLE t (id uuid PRIMARY KEY, v text)").as_deref(),
            Some("id")
        );
        assert_eq!(
            primary_key_column("CREATE TABLE t (a int, b int, PRIMARY KEY (b, a))").as_deref(),
            Some("b")
        );
        assert_eq!(
            primary_key_column("CREATE TABLE t (a int, b int, PRIMARY KEY ((a, b)))").as_deref(),
            Some("a")
        );
        assert!(primary_key_column("CREATE TABLE t (a int)").is_none());
    }

    #[test]
    fn test_counter_column_detection() {
        assert!(has_counter_column(
            "CREATE TABLE hits (page text PRIMARY KEY, views COUNTER)"
        ));
        assert!(has_counter_column(
            "CREATE TABLE hits (page text, views counter, PRIMARY KEY (page))"
        ));
        assert!(!has_counter_column(
            "CREATE TABLE counter_log (id int PRIMARY KEY, counter_name text)"
        ));
        assert!(!has_counter_column("CREATE TABLE t (id int PRIMARY KEY)"));
    }

    #[test]
    fn test_table_named_counter_is_regular() {
        let (_cluster, session) = session();
        session
            .execute(
                "CREATE TABLE counter_log (id int PRIMARY KEY, note text)",
                Consistency::One,
            )
            .unwrap();
        session
            .execute(
                "CREATE TABLE page_views (page text PRIMARY KEY, views counter)",
                Consistency::One,
            )
            .unwrap();

        let meta = |name: &str| session.table_meta(&session.qualify(name)).unwrap();
        assert!(!meta("counter_log").counter);
        assert!(meta("page_views").counter);
    }

    #[test]
    fn test_select_unknown_table_is_invalid_query() {
        let (_cluster, session) = session();
        let err = session.select("nope", None, Consistency::One).unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuery(_)));
    }

    #[test]
    fn test_batch_upsert_merges_columns() {
        let (_cluster, session) = session();
        session
            .create_table(&TableSpec::regular("ledger", "version"), Consistency::One)
            .unwrap();
        session
            .batch_upsert(
                "ledger",
                vec![row(&[
                    ("version", "1".into()),
                    ("rank", 1.into()),
                    ("note", "first".into()),
                ])],
                Consistency::One,
            )
            .unwrap();
        session
            .batch_upsert(
                "ledger",
                vec![row(&[("version", "1".into()), ("rank", 2.into())])],
                Consistency::One,
            )
            .unwrap();

        let rows = session.select("ledger", None, Consistency::One).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["rank"], 2);
        assert_eq!(rows[0]["note"], "first");

        let err = session
            .batch_upsert("ledger", vec![row(&[("rank", 3.into())])], Consistency::One)
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuery(_)));
    }

    #[test]
    fn test_counter_increment() {
        let (_cluster, session) = session();
        session
            .create_table(&TableSpec::counter("counts", "name"), Consistency::One)
            .unwrap();
        assert_eq!(
            session
                .increment_counter("counts", "installed_rank", 1, Consistency::One)
                .unwrap(),
            1
        );
        assert_eq!(
            session
                .increment_counter("counts", "installed_rank", 1, Consistency::One)
                .unwrap(),
            2
        );

        let rows = session.select("counts", Some(1), Consistency::One).unwrap();
        assert_eq!(rows[0]["name"], "installed_rank");
        assert_eq!(rows[0]["count"], 2);
    }

    #[test]
    fn test_single_host_topology() {
        let (_cluster, session) = session();
        assert_eq!(session.hosts().unwrap().len(), 1);
        assert_eq!(session.keyspace(), "app");
    }
}
