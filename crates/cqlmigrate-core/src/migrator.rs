//! Entry point tying configuration, resolvers and the ledger together.

use crate::command::{Baseline, Migrate, Validate};
use crate::config::MigrationConfig;
use crate::error::{Error, Result};
use crate::info::{MigrationInfo, MigrationInfoService};
use crate::ledger::AppliedLedger;
use crate::location::ScriptsLocations;
use crate::resolver::{CompositeResolver, MigrationRegistry, MigrationResolver};
use crate::session::Session;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Runs migrate, validate, info and baseline against a session.
pub struct Migrator {
    config: MigrationConfig,
    locations: ScriptsLocations,
    registry: Arc<MigrationRegistry>,
    resolvers: Vec<Arc<dyn MigrationResolver>>,
    banner_logged: AtomicBool,
}

impl Migrator {
    /// Create a migrator. Fails on an invalid configuration.
    pub fn new(config: MigrationConfig) -> Result<Self> {
        config.validate()?;
        let locations = config.scripts_locations()?;
        Ok(Self {
            config,
            locations,
            registry: Arc::new(MigrationRegistry::new()),
            resolvers: Vec::new(),
            banner_logged: AtomicBool::new(false),
        })
    }

    /// Serve `embedded:` locations from this registry.
    pub fn with_registry(mut self, registry: MigrationRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Add a resolver on top of the location-based ones.
    pub fn with_resolver(mut self, resolver: Arc<dyn MigrationResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// The configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// The resolver built from the configured locations and custom resolvers.
    pub fn resolver(&self) -> CompositeResolver {
        self.resolvers.iter().fold(
            CompositeResolver::for_locations(
                &self.locations,
                Arc::clone(&self.registry),
                self.config.consistency,
            ),
            |composite, extra| composite.with_resolver(Arc::clone(extra)),
        )
    }

    fn log_banner(&self) {
        if !self.banner_logged.swap(true, Ordering::Relaxed) {
            info!(version = env!("CARGO_PKG_VERSION"), "cqlmigrate");
        }
    }

    fn ledger<'s>(&self, session: &'s dyn Session) -> Result<AppliedLedger<'s>> {
        self.log_banner();
        if !session.keyspace().eq_ignore_ascii_case(&self.config.keyspace) {
            return Err(Error::Connection(format!(
                "session is bound to keyspace '{}', expected '{}'",
                session.keyspace(),
                self.config.keyspace
            )));
        }
        AppliedLedger::new(session, &self.config)
    }

    /// Apply pending migrations. Returns how many were applied.
    pub fn migrate(&self, session: &dyn Session) -> Result<usize> {
        let ledger = self.ledger(session)?;
        let resolver = self.resolver();

        if self.config.validate_on_migrate {
            let validate = Validate::new(
                &resolver,
                &ledger,
                self.config.target.clone(),
                self.config.allow_out_of_order,
            );
            if let Some(message) = validate.run()? {
                return Err(Error::Validation(message));
            }
        }

        Migrate::new(
            &resolver,
            &ledger,
            session,
            self.config.target.clone(),
            self.config.allow_out_of_order,
            self.config.user.clone(),
        )
        .run()
    }

    /// Check applied migrations against local candidates.
    pub fn validate(&self, session: &dyn Session) -> Result<()> {
        let ledger = self.ledger(session)?;
        let resolver = self.resolver();
        let validate = Validate::new(
            &resolver,
            &ledger,
            self.config.target.clone(),
            self.config.allow_out_of_order,
        );
        match validate.run()? {
            Some(message) => Err(Error::Validation(message)),
            None => Ok(()),
        }
    }

    /// The reconciled timeline, in ascending version order.
    pub fn info(&self, session: &dyn Session) -> Result<Vec<MigrationInfo>> {
        let ledger = self.ledger(session)?;
        let resolver = self.resolver();
        let mut service = MigrationInfoService::new(
            &resolver,
            &ledger,
            self.config.target.clone(),
            self.config.allow_out_of_order,
        );
        service.refresh()?;
        Ok(service.all().to_vec())
    }

    /// Record a baseline marker.
    ///
    /// Uses the configured baseline version, or the lowest resolved version
    /// when none is configured.
    pub fn baseline(&self, session: &dyn Session) -> Result<()> {
        let ledger = self.ledger(session)?;
        let version = match &self.config.baseline_version {
            Some(version) => version.clone(),
            None => self
                .resolver()
                .resolve()?
                .into_iter()
                .map(|m| m.version)
                .min()
                .ok_or_else(|| {
                    Error::Baseline(
                        "no baseline version configured and no migration could be resolved"
                            .to_string(),
                    )
                })?,
        };

        Baseline::new(
            &ledger,
            version,
            self.config.baseline_description.clone(),
            self.config.user.clone(),
        )
        .run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::EmbeddedCluster;

    #[test]
    fn test_rejects_invalid_config() {
        assert!(matches!(
            Migrator::new(MigrationConfig::default()),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Migrator::new(MigrationConfig::new("ks").with_locations([" "])),
            Err(Error::Location { .. })
        ));
    }

    #[test]
    fn test_session_keyspace_must_match() {
        let cluster = EmbeddedCluster::temporary().unwrap();
        cluster.create_keyspace("other").unwrap();
        let session = cluster.connect("other").unwrap();

        let migrator = Migrator::new(MigrationConfig::new("ks")).unwrap();
        assert!(matches!(migrator.migrate(&session), Err(Error::Connection(_))));
    }

    #[test]
    fn test_resolver_covers_locations_and_custom() {
        let migrator = Migrator::new(
            MigrationConfig::new("ks").with_locations(["embedded:a", "filesystem:b"]),
        )
        .unwrap()
        .with_resolver(Arc::new(CompositeResolver::default()));
        assert_eq!(migrator.resolver().len(), 5);
    }
}
