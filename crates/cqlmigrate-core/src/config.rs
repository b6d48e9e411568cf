//! Migration configuration.

use crate::error::{Error, Result};
use crate::location::ScriptsLocations;
use crate::session::Consistency;
use crate::version::{MigrationVersion, Target};

/// Name of the applied ledger table before prefixing.
pub const LEDGER_TABLE: &str = "cassandra_migration_version";

/// Suffix of the companion counter table.
pub const COUNTS_SUFFIX: &str = "_counts";

/// Location scanned when none is configured.
pub const DEFAULT_LOCATION: &str = "filesystem:db/migration";

/// The only accepted source encoding.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Description of the baseline marker when none is configured.
pub const DEFAULT_BASELINE_DESCRIPTION: &str = "<< Cassandra Baseline >>";

/// Environment variable prefix used by [`MigrationConfig::from_env`].
pub const ENV_PREFIX: &str = "CQLMIGRATE_";

/// Settings for a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Keyspace holding both the schema and the ledger.
    pub keyspace: String,

    /// Prefix prepended to the ledger table names.
    pub table_prefix: String,

    /// Location descriptors to scan for migrations.
    pub locations: Vec<String>,

    /// Source encoding of script files.
    pub encoding: String,

    /// Upper bound of a migrate run.
    pub target: Target,

    /// Whether versions below the highest applied one may still be applied.
    pub allow_out_of_order: bool,

    /// Identity recorded as `installed_by`.
    pub user: String,

    /// Baseline version. Defaults to the lowest resolved version.
    pub baseline_version: Option<MigrationVersion>,

    /// Description recorded on the baseline marker.
    pub baseline_description: String,

    /// Run validate before migrating and abort on drift.
    pub validate_on_migrate: bool,

    /// Consistency for ledger and script statements. When unset, `ALL` on a
    /// multi-node cluster and `ONE` on a single node.
    pub consistency: Option<Consistency>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            keyspace: String::new(),
            table_prefix: String::new(),
            locations: vec![DEFAULT_LOCATION.to_string()],
            encoding: DEFAULT_ENCODING.to_string(),
            target: Target::Latest,
            allow_out_of_order: false,
            user: String::new(),
            baseline_version: None,
            baseline_description: DEFAULT_BASELINE_DESCRIPTION.to_string(),
            validate_on_migrate: false,
            consistency: None,
        }
    }
}

impl MigrationConfig {
    /// Create a configuration for the given keyspace.
    pub fn new(keyspace: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            ..Default::default()
        }
    }

    /// Read a configuration from `CQLMIGRATE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from a key lookup, using the same keys as
    /// [`from_env`](Self::from_env). Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(keyspace) = get("KEYSPACE") {
            config.keyspace = keyspace;
        }
        if let Some(prefix) = get("TABLE_PREFIX") {
            config.table_prefix = prefix;
        }
        if let Some(locations) = get("LOCATIONS") {
            config.locations = split_list(&locations);
        }
        if let Some(encoding) = get("ENCODING") {
            config.encoding = encoding;
        }
        if let Some(target) = get("TARGET") {
            config.target = Target::parse(&target)?;
        }
        if let Some(flag) = get("ALLOW_OUT_OF_ORDER") {
            config.allow_out_of_order = parse_flag("ALLOW_OUT_OF_ORDER", &flag)?;
        }
        if let Some(user) = get("USER") {
            config.user = user;
        }
        if let Some(version) = get("BASELINE_VERSION") {
            config.baseline_version = Some(MigrationVersion::parse(&version)?);
        }
        if let Some(description) = get("BASELINE_DESCRIPTION") {
            config.baseline_description = description;
        }
        if let Some(flag) = get("VALIDATE_ON_MIGRATE") {
            config.validate_on_migrate = parse_flag("VALIDATE_ON_MIGRATE", &flag)?;
        }
        if let Some(consistency) = get("CONSISTENCY") {
            config.consistency = Some(consistency.parse()?);
        }
        Ok(config)
    }

    /// Set the ledger table prefix.
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Replace the script locations.
    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    /// Set the source encoding.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set the target.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Allow or forbid out-of-order application.
    pub fn with_allow_out_of_order(mut self, allow: bool) -> Self {
        self.allow_out_of_order = allow;
        self
    }

    /// Set the identity recorded on applied rows.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set an explicit baseline version.
    pub fn with_baseline_version(mut self, version: MigrationVersion) -> Self {
        self.baseline_version = Some(version);
        self
    }

    /// Set the baseline marker description.
    pub fn with_baseline_description(mut self, description: impl Into<String>) -> Self {
        self.baseline_description = description.into();
        self
    }

    /// Validate before every migrate.
    pub fn with_validate_on_migrate(mut self, validate: bool) -> Self {
        self.validate_on_migrate = validate;
        self
    }

    /// Fix the consistency level instead of deriving it from the topology.
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.keyspace.trim().is_empty() {
            return Err(Error::Config("keyspace name must be specified".to_string()));
        }
        if self.locations.is_empty() {
            return Err(Error::Config("at least one location is required".to_string()));
        }
        let encoding = self.encoding.replace(['-', '_'], "");
        if !encoding.eq_ignore_ascii_case("utf8") {
            return Err(Error::Config(format!(
                "unsupported encoding '{}', only {DEFAULT_ENCODING} is supported",
                self.encoding
            )));
        }
        if self.baseline_description.trim().is_empty() {
            return Err(Error::Config(
                "baseline description must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The normalised script locations.
    pub fn scripts_locations(&self) -> Result<ScriptsLocations> {
        ScriptsLocations::new(&self.locations)
    }

    /// Name of the applied ledger table.
    pub fn table_name(&self) -> String {
        format!("{}{}", self.table_prefix, LEDGER_TABLE)
    }

    /// Name of the companion counter table.
    pub fn counts_table_name(&self) -> String {
        format!("{}{}", self.table_name(), COUNTS_SUFFIX)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{ENV_PREFIX}{name} must be a boolean, got '{value}'"
        ))),
    }
}
