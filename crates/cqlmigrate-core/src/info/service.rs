//! Reconciliation over a resolver and a ledger.

use super::{Context, MigrationInfo, MigrationState};
use crate::error::Result;
use crate::ledger::{AppliedLedger, AppliedMigration};
use crate::resolver::{MigrationResolver, MigrationType, ResolvedMigration};
use crate::version::{MigrationVersion, Target};
use std::collections::BTreeMap;

/// Timeline of every known version.
pub struct MigrationInfoService<'a> {
    resolver: &'a dyn MigrationResolver,
    ledger: &'a AppliedLedger<'a>,
    target: Target,
    allow_out_of_order: bool,
    infos: Vec<MigrationInfo>,
}

impl<'a> MigrationInfoService<'a> {
    /// Create a service. Nothing is read until [`refresh`](Self::refresh).
    pub fn new(
        resolver: &'a dyn MigrationResolver,
        ledger: &'a AppliedLedger<'a>,
        target: Target,
        allow_out_of_order: bool,
    ) -> Self {
        Self {
            resolver,
            ledger,
            target,
            allow_out_of_order,
            infos: Vec::new(),
        }
    }

    /// Re-resolve and re-read the ledger, replacing the timeline.
    pub fn refresh(&mut self) -> Result<()> {
        let resolved = self.resolver.resolve()?;
        let applied = self.ledger.find_applied(None)?;
        self.merge(resolved, applied);
        Ok(())
    }

    fn merge(&mut self, resolved: Vec<ResolvedMigration>, applied: Vec<AppliedMigration>) {
        let applied_out_of_order = Context::out_of_order_versions(&applied);
        let mut last_applied = MigrationVersion::EMPTY;
        let mut baseline = MigrationVersion::EMPTY;
        let mut applied_by_version = BTreeMap::new();
        for migration in applied {
            if migration.version > last_applied {
                last_applied = migration.version.clone();
            }
            if migration.migration_type == MigrationType::Baseline {
                baseline = migration.version.clone();
            }
            applied_by_version.insert(migration.version.clone(), migration);
        }

        let mut last_resolved = MigrationVersion::EMPTY;
        let mut resolved_by_version = BTreeMap::new();
        for migration in resolved {
            if migration.version > last_resolved {
                last_resolved = migration.version.clone();
            }
            resolved_by_version.insert(migration.version.clone(), migration);
        }

        let current = (!last_applied.is_empty()).then_some(&last_applied);
        let context = Context {
            allow_out_of_order: self.allow_out_of_order,
            ceiling: self.target.ceiling(current),
            last_applied: last_applied.clone(),
            baseline,
            last_resolved,
            applied_out_of_order,
        };

        let mut versions: Vec<MigrationVersion> = resolved_by_version
            .keys()
            .chain(applied_by_version.keys())
            .cloned()
            .collect();
        versions.sort();
        versions.dedup();

        self.infos = versions
            .into_iter()
            .filter_map(|version| {
                MigrationInfo::new(
                    resolved_by_version.remove(&version),
                    applied_by_version.remove(&version),
                    &context,
                )
            })
            .collect();
    }

    /// Every version in ascending order.
    pub fn all(&self) -> &[MigrationInfo] {
        &self.infos
    }

    /// The highest version with a ledger row.
    pub fn current(&self) -> Option<&MigrationInfo> {
        self.infos.iter().rev().find(|i| i.state().is_applied())
    }

    /// Versions a migrate run would execute, ascending.
    pub fn pending(&self) -> Vec<&MigrationInfo> {
        self.filter(|s| s.is_runnable())
    }

    /// Versions with a ledger row.
    pub fn applied(&self) -> Vec<&MigrationInfo> {
        self.filter(|s| s.is_applied())
    }

    /// Versions with a local candidate.
    pub fn resolved(&self) -> Vec<&MigrationInfo> {
        self.infos.iter().filter(|i| i.resolved().is_some()).collect()
    }

    /// Versions recorded as failed.
    pub fn failed(&self) -> Vec<&MigrationInfo> {
        self.filter(|s| s.is_failed())
    }

    /// Versions that will run below the highest applied version.
    pub fn out_of_order(&self) -> Vec<&MigrationInfo> {
        self.filter(|s| s == MigrationState::OutOfOrderPending)
    }

    /// Versions that were applied after a higher version.
    pub fn applied_out_of_order(&self) -> Vec<&MigrationInfo> {
        self.filter(|s| s == MigrationState::OutOfOrder)
    }

    /// Versions held back because out-of-order application is disallowed.
    pub fn blocked(&self) -> Vec<&MigrationInfo> {
        self.filter(|s| s == MigrationState::OutOfOrderBlocked)
    }

    /// Applied versions with no local candidate.
    pub fn missing(&self) -> Vec<&MigrationInfo> {
        self.filter(|s| s == MigrationState::Missing)
    }

    /// Applied versions newer than every local candidate.
    pub fn future(&self) -> Vec<&MigrationInfo> {
        self.filter(|s| matches!(s, MigrationState::Future | MigrationState::FutureFailed))
    }

    /// The first disagreement between the ledger and local candidates.
    pub fn validate(&self) -> Option<String> {
        self.infos.iter().find_map(MigrationInfo::validate)
    }

    fn filter(&self, predicate: impl Fn(MigrationState) -> bool) -> Vec<&MigrationInfo> {
        self.infos.iter().filter(|i| predicate(i.state())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MigrationConfig;
    use crate::resolver::testing::{candidate, FixedResolver};
    use crate::session::EmbeddedCluster;

    fn record(ledger: &AppliedLedger<'_>, migration: &ResolvedMigration) {
        ledger
            .insert(AppliedMigration::new(
                migration.version.clone(),
                migration.description.clone(),
                migration.migration_type,
                migration.script.clone(),
                migration.checksum,
                "tester",
                1,
                true,
            ))
            .unwrap();
    }

    fn states(service: &MigrationInfoService<'_>) -> Vec<(String, MigrationState)> {
        service
            .all()
            .iter()
            .map(|i| (i.version().to_string(), i.state()))
            .collect()
    }

    #[test]
    fn test_timeline_with_blocked_and_missing() {
        let cluster = EmbeddedCluster::temporary().unwrap();
        cluster.create_keyspace("ks").unwrap();
        let session = cluster.connect("ks").unwrap();
        let ledger = AppliedLedger::new(&session, &MigrationConfig::new("ks")).unwrap();
        ledger.ensure_schema().unwrap();

        let one = candidate("1", "one", Some(1));
        let two = candidate("2", "two", Some(2));
        let gone = candidate("3", "gone", Some(3));
        record(&ledger, &one);
        record(&ledger, &two);
        record(&ledger, &gone);

        let resolver = FixedResolver(vec![
            one,
            candidate("1.5", "late", Some(15)),
            two,
            candidate("4", "next", Some(4)),
        ]);
        let mut service = MigrationInfoService::new(&resolver, &ledger, Target::Latest, false);
        service.refresh().unwrap();

        assert_eq!(
            states(&service),
            vec![
                ("1".to_string(), MigrationState::Applied),
                ("1.5".to_string(), MigrationState::OutOfOrderBlocked),
                ("2".to_string(), MigrationState::Applied),
                ("3".to_string(), MigrationState::Missing),
                ("4".to_string(), MigrationState::Pending),
            ]
        );
        assert_eq!(service.current().unwrap().version().to_string(), "3");
        assert_eq!(service.pending().len(), 1);
        assert_eq!(service.blocked().len(), 1);
        assert_eq!(service.missing().len(), 1);
        assert!(service.future().is_empty());
        assert_eq!(
            service.validate().unwrap(),
            "Detected applied migration not resolved locally: 3"
        );
    }

    #[test]
    fn test_rows_above_local_scripts_are_future() {
        let cluster = EmbeddedCluster::temporary().unwrap();
        cluster.create_keyspace("ks").unwrap();
        let session = cluster.connect("ks").unwrap();
        let ledger = AppliedLedger::new(&session, &MigrationConfig::new("ks")).unwrap();
        ledger.ensure_schema().unwrap();

        let one = candidate("1.0", "one", Some(1));
        record(&ledger, &one);
        record(&ledger, &candidate("2.0", "two", Some(2)));

        let resolver = FixedResolver(vec![one]);
        let mut service = MigrationInfoService::new(&resolver, &ledger, Target::Latest, false);
        service.refresh().unwrap();

        assert_eq!(
            states(&service),
            vec![
                ("1.0".to_string(), MigrationState::Applied),
                ("2.0".to_string(), MigrationState::Future),
            ]
        );
        assert_eq!(service.future().len(), 1);
        assert!(service.missing().is_empty());
        assert_eq!(service.current().unwrap().state(), MigrationState::Future);
        assert_eq!(
            service.validate().unwrap(),
            "Detected applied migration not resolved locally: 2.0"
        );
    }

    #[test]
    fn test_targets() {
        let cluster = EmbeddedCluster::temporary().unwrap();
        cluster.create_keyspace("ks").unwrap();
        let session = cluster.connect("ks").unwrap();
        let ledger = AppliedLedger::new(&session, &MigrationConfig::new("ks")).unwrap();
        ledger.ensure_schema().unwrap();

        let one = candidate("1", "one", Some(1));
        record(&ledger, &one);
        let resolver = FixedResolver(vec![one, candidate("2", "two", Some(2)), candidate("3", "three", Some(3))]);

        let target = Target::Version(MigrationVersion::parse("2").unwrap());
        let mut service = MigrationInfoService::new(&resolver, &ledger, target, false);
        service.refresh().unwrap();
        assert_eq!(service.pending().len(), 1);
        assert_eq!(service.all()[2].state(), MigrationState::AboveTarget);

        let mut service = MigrationInfoService::new(&resolver, &ledger, Target::Current, false);
        service.refresh().unwrap();
        assert!(service.pending().is_empty());
        assert!(service.validate().is_none());
    }

    #[test]
    fn test_empty_ledger_everything_pending() {
        let cluster = EmbeddedCluster::temporary().unwrap();
        cluster.create_keyspace("ks").unwrap();
        let session = cluster.connect("ks").unwrap();
        let ledger = AppliedLedger::new(&session, &MigrationConfig::new("ks")).unwrap();

        let resolver = FixedResolver(vec![candidate("1", "a", None), candidate("1.1", "b", None)]);
        let mut service = MigrationInfoService::new(&resolver, &ledger, Target::Latest, false);
        service.refresh().unwrap();
        assert_eq!(service.pending().len(), 2);
        assert!(service.current().is_none());
        assert!(service.validate().is_none());
    }
}
