//! Merges the output of every configured resolver.

use super::cql::CqlMigrationResolver;
use super::procedural::ProceduralMigrationResolver;
use super::registry::MigrationRegistry;
use super::{MigrationResolver, ResolvedMigration};
use crate::error::{Error, Result};
use crate::location::ScriptsLocations;
use crate::session::Consistency;
use std::sync::Arc;
use tracing::debug;

/// Resolver over a set of resolvers.
///
/// Output is sorted by version. Identical candidates found more than once
/// collapse to one; candidates sharing a version with different content fail
/// resolution with [`Error::Conflict`].
#[derive(Default)]
pub struct CompositeResolver {
    resolvers: Vec<Arc<dyn MigrationResolver>>,
}

impl CompositeResolver {
    /// Create a resolver over the given resolvers.
    pub fn new(resolvers: Vec<Arc<dyn MigrationResolver>>) -> Self {
        Self { resolvers }
    }

    /// CQL and procedural resolvers for every location.
    ///
    /// Scripts run at `consistency` when given, otherwise at the topology
    /// default.
    pub fn for_locations(
        locations: &ScriptsLocations,
        registry: Arc<MigrationRegistry>,
        consistency: Option<Consistency>,
    ) -> Self {
        let mut resolvers: Vec<Arc<dyn MigrationResolver>> = Vec::with_capacity(locations.len() * 2);
        for location in locations {
            resolvers.push(Arc::new(
                CqlMigrationResolver::new(location.clone(), Arc::clone(&registry))
                    .with_consistency(consistency),
            ));
            resolvers.push(Arc::new(ProceduralMigrationResolver::new(
                location.clone(),
                Arc::clone(&registry),
            )));
        }
        Self { resolvers }
    }

    /// Add a custom resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn MigrationResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Number of underlying resolvers.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether there are no underlying resolvers.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl MigrationResolver for CompositeResolver {
    fn resolve(&self) -> Result<Vec<ResolvedMigration>> {
        let mut migrations = Vec::new();
        for resolver in &self.resolvers {
            migrations.extend(resolver.resolve()?);
        }

        migrations.sort_by(|a, b| a.version.cmp(&b.version));
        migrations.dedup();
        check_conflicts(&migrations)?;

        debug!(count = migrations.len(), "resolved migrations");
        Ok(migrations)
    }
}

/// Fail on two candidates with the same version. Expects sorted input.
fn check_conflicts(migrations: &[ResolvedMigration]) -> Result<()> {
    for pair in migrations.windows(2) {
        if pair[0].version == pair[1].version {
            return Err(Error::Conflict {
                version: pair[0].version.clone(),
                first: pair[0].offender(),
                second: pair[1].offender(),
            });
        }
    }
    Ok(())
}
