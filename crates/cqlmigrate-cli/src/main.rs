//! cqlmigrate Command-Line Client
//!
//! Runs migrate, validate, info and baseline against an embedded keyspace.

mod formatter;

use clap::{Parser, Subcommand};
use cqlmigrate_core::config::{DEFAULT_BASELINE_DESCRIPTION, DEFAULT_ENCODING, DEFAULT_LOCATION};
use cqlmigrate_core::{
    Consistency, EmbeddedCluster, MigrationConfig, MigrationVersion, Migrator, Target,
};
use formatter::OutputFormat;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// cqlmigrate Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "cqlmigrate")]
#[command(version, about = "Versioned schema migrations for wide-column keyspaces")]
pub struct Args {
    /// Directory holding the embedded cluster
    #[arg(long, env = "CQLMIGRATE_DATA_PATH", default_value = "./cqlmigrate-data")]
    pub data_path: PathBuf,

    /// Keyspace to migrate
    #[arg(short = 'k', long, env = "CQLMIGRATE_KEYSPACE")]
    pub keyspace: String,

    /// Create the keyspace if it does not exist
    #[arg(long)]
    pub create_keyspace: bool,

    /// Prefix for the ledger tables
    #[arg(long, env = "CQLMIGRATE_TABLE_PREFIX", default_value = "")]
    pub table_prefix: String,

    /// Script locations (filesystem:<dir> or embedded:<path>), comma separated
    #[arg(
        short = 'l',
        long,
        env = "CQLMIGRATE_LOCATIONS",
        value_delimiter = ',',
        default_value = DEFAULT_LOCATION
    )]
    pub locations: Vec<String>,

    /// Script encoding
    #[arg(long, env = "CQLMIGRATE_ENCODING", default_value = DEFAULT_ENCODING)]
    pub encoding: String,

    /// Target version: latest, current, or a version
    #[arg(long, env = "CQLMIGRATE_TARGET", default_value = "latest", value_parser = Target::parse)]
    pub target: Target,

    /// Apply versions older than the latest applied one
    #[arg(long, env = "CQLMIGRATE_ALLOW_OUT_OF_ORDER")]
    pub allow_out_of_order: bool,

    /// Recorded as installed_by in the ledger
    #[arg(long, env = "CQLMIGRATE_USER", default_value = "")]
    pub user: String,

    /// Version to baseline at (defaults to the lowest resolved version)
    #[arg(long, env = "CQLMIGRATE_BASELINE_VERSION", value_parser = MigrationVersion::parse)]
    pub baseline_version: Option<MigrationVersion>,

    /// Description of the baseline marker
    #[arg(
        long,
        env = "CQLMIGRATE_BASELINE_DESCRIPTION",
        default_value = DEFAULT_BASELINE_DESCRIPTION
    )]
    pub baseline_description: String,

    /// Validate before migrating
    #[arg(long, env = "CQLMIGRATE_VALIDATE_ON_MIGRATE")]
    pub validate_on_migrate: bool,

    /// Consistency level (ONE, QUORUM, ALL); derived from the topology when unset
    #[arg(long, env = "CQLMIGRATE_CONSISTENCY", value_parser = Consistency::from_str)]
    pub consistency: Option<Consistency>,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Apply pending migrations
    Migrate,
    /// Check applied migrations against local scripts
    Validate,
    /// Show the migration timeline
    Info,
    /// Mark an existing keyspace as being at a version
    Baseline,
}

impl Args {
    fn config(&self) -> MigrationConfig {
        let mut config = MigrationConfig::new(&self.keyspace)
            .with_table_prefix(&self.table_prefix)
            .with_locations(&self.locations)
            .with_encoding(&self.encoding)
            .with_target(self.target.clone())
            .with_allow_out_of_order(self.allow_out_of_order)
            .with_user(&self.user)
            .with_baseline_description(&self.baseline_description)
            .with_validate_on_migrate(self.validate_on_migrate);
        if let Some(version) = &self.baseline_version {
            config = config.with_baseline_version(version.clone());
        }
        if let Some(consistency) = self.consistency {
            config = config.with_consistency(consistency);
        }
        config
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("cqlmigrate=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cqlmigrate=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let cluster = EmbeddedCluster::open(&args.data_path)?;
    if args.create_keyspace && cluster.create_keyspace(&args.keyspace)? {
        info!(keyspace = %args.keyspace, "created keyspace");
    }
    let session = cluster.connect(&args.keyspace)?;

    let migrator = Migrator::new(args.config())?;
    let formatter = formatter::create_formatter(args.format);

    let output = match args.command {
        Command::Migrate => formatter.format_migrated(migrator.migrate(&session)?),
        Command::Validate => {
            migrator.validate(&session)?;
            formatter.format_message("Validation succeeded")
        }
        Command::Info => formatter.format_info(&migrator.info(&session)?),
        Command::Baseline => {
            migrator.baseline(&session)?;
            formatter.format_message("Baseline recorded")
        }
    };
    println!("{}", output);

    cluster.flush()?;
    Ok(())
}
