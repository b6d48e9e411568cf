//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::Table;
use cqlmigrate_core::MigrationInfo;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the migration timeline.
    fn format_info(&self, infos: &[MigrationInfo]) -> String;

    /// Format the outcome of a migrate run.
    fn format_migrated(&self, applied: usize) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

fn installed_on(info: &MigrationInfo) -> String {
    info.installed_on()
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn migration_type(info: &MigrationInfo) -> String {
    info.migration_type()
        .map(|kind| kind.to_string())
        .unwrap_or_default()
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_info(&self, infos: &[MigrationInfo]) -> String {
        if infos.is_empty() {
            return "No migrations found".to_string();
        }

        let mut table = Table::new();
        table.set_header(vec!["Version", "Description", "Type", "Installed on", "State"]);
        for info in infos {
            table.add_row(vec![
                info.version().to_string(),
                info.description().to_string(),
                migration_type(info),
                installed_on(info),
                info.state().display_name().to_string(),
            ]);
        }
        table.to_string()
    }

    fn format_migrated(&self, applied: usize) -> String {
        match applied {
            0 => "Keyspace is up to date".to_string(),
            1 => "Applied 1 migration".to_string(),
            n => format!("Applied {} migrations", n),
        }
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_info(&self, infos: &[MigrationInfo]) -> String {
        let rows: Vec<serde_json::Value> = infos
            .iter()
            .map(|info| {
                serde_json::json!({
                    "version": info.version().to_string(),
                    "description": info.description(),
                    "type": info.migration_type().map(|kind| kind.to_string()),
                    "script": info.script(),
                    "checksum": info.checksum(),
                    "installed_on": info.installed_on().map(|at| at.to_rfc3339()),
                    "execution_time": info.execution_time(),
                    "state": info.state().display_name(),
                })
            })
            .collect();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_migrated(&self, applied: usize) -> String {
        serde_json::json!({ "applied": applied }).to_string()
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({ "message": message }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cqlmigrate_core::{EmbeddedCluster, MigrationConfig, MigrationRegistry, Migrator};

    fn sample_infos() -> Vec<MigrationInfo> {
        let cluster = EmbeddedCluster::temporary().unwrap();
        cluster.create_keyspace("app").unwrap();
        let session = cluster.connect("app").unwrap();

        let registry = MigrationRegistry::new()
            .with_script("db/V1__Create_users.cql", "CREATE TABLE users (id int PRIMARY KEY);")
            .with_script("db/V2__Create_items.cql", "CREATE TABLE items (id int PRIMARY KEY);");
        let config = MigrationConfig::new("app")
            .with_locations(["embedded:db"])
            .with_target(cqlmigrate_core::Target::Version(
                cqlmigrate_core::MigrationVersion::parse("1").unwrap(),
            ));
        let migrator = Migrator::new(config).unwrap().with_registry(registry);
        migrator.migrate(&session).unwrap();
        migrator.info(&session).unwrap()
    }

    #[test]
    fn test_table_lists_every_migration() {
        let output = TableFormatter.format_info(&sample_infos());
        assert!(output.contains("Create users"));
        assert!(output.contains("Success"));
        assert!(output.contains("Create items"));
        assert!(output.contains("Above Target"));
    }

    #[test]
    fn test_table_empty() {
        assert_eq!(TableFormatter.format_info(&[]), "No migrations found");
    }

    #[test]
    fn test_json_rows() {
        let output = JsonFormatter.format_info(&sample_infos());
        let rows: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["version"], "1");
        assert_eq!(rows[0]["type"], "CQL");
        assert!(rows[0]["installed_on"].is_string());
        assert!(rows[1]["installed_on"].is_null());
    }

    #[test]
    fn test_migrated_messages() {
        assert_eq!(TableFormatter.format_migrated(0), "Keyspace is up to date");
        assert_eq!(TableFormatter.format_migrated(3), "Applied 3 migrations");
        assert_eq!(JsonFormatter.format_migrated(2), r#"{"applied":2}"#);
    }
}
