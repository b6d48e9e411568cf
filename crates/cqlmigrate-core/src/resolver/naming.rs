//! The `V<version>__<description>` naming grammar.

use crate::error::{Error, Result};
use crate::version::MigrationVersion;

/// Prefix of versioned migrations.
pub const VERSION_PREFIX: &str = "V";

/// Separator between version and description.
pub const SEPARATOR: &str = "__";

/// Extension of CQL scripts.
pub const CQL_SUFFIX: &str = ".cql";

/// Split a migration name into version and description.
///
/// Underscores in the version become dots and underscores in the
/// description become spaces.
pub fn parse_name(name: &str, prefix: &str, suffix: &str) -> Result<(MigrationVersion, String)> {
    let naming_error = || Error::Naming {
        name: name.to_string(),
        suggestion: format!("{prefix}1_2{SEPARATOR}Description{suffix}"),
    };

    let stem = name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(suffix))
        .ok_or_else(naming_error)?;

    let (version, description) = stem.split_once(SEPARATOR).ok_or_else(naming_error)?;
    let version = MigrationVersion::parse(version)?;
    Ok((version, description.replace('_', " ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_name() {
        let (version, description) =
            parse_name("V1_2_3__Add_user_table.cql", VERSION_PREFIX, CQL_SUFFIX).unwrap();
        assert_eq!(version, MigrationVersion::parse("1.2.3").unwrap());
        assert_eq!(description, "Add user table");
    }

    #[test]
    fn test_parse_unit_name() {
        let (version, description) = parse_name("V3_0_1__Three_zero_one", VERSION_PREFIX, "").unwrap();
        assert_eq!(version.to_string(), "3.0.1");
        assert_eq!(description, "Three zero one");
    }

    #[test]
    fn test_missing_separator_suggests_format() {
        let err = parse_name("V1_2-Description.cql", VERSION_PREFIX, CQL_SUFFIX).unwrap_err();
        match err {
            Error::Naming { name, suggestion } => {
                assert_eq!(name, "V1_2-Description.cql");
                assert_eq!(suggestion, "V1_2__Description.cql");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bad_version_is_format_error() {
        let err = parse_name("V1-2__x.cql", VERSION_PREFIX, CQL_SUFFIX).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_empty_description_is_allowed() {
        let (_, description) = parse_name("V4__.cql", VERSION_PREFIX, CQL_SUFFIX).unwrap();
        assert!(description.is_empty());
    }
}
