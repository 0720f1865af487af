use thiserror::Error;
use tracing::{info, instrument};

use crate::burnside::{self, BurnsideError};
use crate::cache::{CacheError, CacheStore, CycleCacheManager, SiteSetId};
use crate::config::{ConfigError, EnumerationConfig};
use crate::enumeration::{enumerate, EnumerationError, OrbitMap};
use crate::group::{derive, GeometryError, PermutationGroup};
use crate::symmetry::{SymmetryOperation, Vector3};

/// Any failure while serving a counting request
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),
    #[error(transparent)]
    Burnside(#[from] BurnsideError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Symmetry-distinct configurations of k marked sites
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConfigurations {
    /// Canonical configurations with degeneracies, empty if not enumerated
    pub orbits: OrbitMap,
    pub unique: u64,
    /// C(N, k)
    pub total: u64
}

impl UniqueConfigurations {
    /// Whether per-configuration data is available
    pub fn is_enumerated(&self) -> bool {
        !self.orbits.is_empty() || self.total == 0
    }
}

/// Serves counting requests, enumerating where feasible and falling back to
/// Burnside's lemma otherwise
pub struct Dispatcher<S: CacheStore> {
    config: EnumerationConfig,
    caches: CycleCacheManager<S>
}

impl<S: CacheStore> Dispatcher<S> {
    pub fn new(config: EnumerationConfig, store: S) -> Result<Dispatcher<S>, Error> {
        config.validate()?;
        Ok(Dispatcher {config, caches: CycleCacheManager::new(store)})
    }

    pub fn config(&self) -> &EnumerationConfig {
        &self.config
    }

    pub fn caches(&self) -> &CycleCacheManager<S> {
        &self.caches
    }

    /// Derive the permutation group of a site set with the configured tolerance
    ///
    /// The group is validated and its cycle cache prepared if absent.
    pub fn prepare(&self, site_set: &SiteSetId, operations: &[SymmetryOperation], coordinates: &[Vector3]) -> Result<PermutationGroup, Error> {
        let group = derive(operations, coordinates, &self.config.tolerance)?;
        group.validate().map_err(GeometryError::from)?;
        self.caches.get_or_build(site_set, Some(&group))?;
        Ok(group)
    }

    /// Unique configurations for `k` marked sites
    ///
    /// Below the enumeration threshold, the canonical configurations and
    /// their degeneracies are returned alongside the counts. Above it, only
    /// the counts are available.
    ///
    /// ```
    /// # use orbitcount::dispatch::Dispatcher;
    /// # use orbitcount::config::EnumerationConfig;
    /// # use orbitcount::cache::MemoryStore;
    /// # use orbitcount::group::PermutationGroup;
    /// let c4 = PermutationGroup::new(vec![
    ///     vec![0, 1, 2, 3], vec![1, 2, 3, 0], vec![2, 3, 0, 1], vec![3, 0, 1, 2],
    /// ]).unwrap();
    /// let config = EnumerationConfig {enum_max: 4, ..Default::default()};
    /// let dispatcher = Dispatcher::new(config, MemoryStore::new()).unwrap();
    /// let id = "square".into();
    ///
    /// let singles = dispatcher.get_unique(1, &c4, &id).unwrap();
    /// assert_eq!((singles.unique, singles.total, singles.orbits.len()), (1, 4, 1));
    ///
    /// let pairs = dispatcher.get_unique(2, &c4, &id).unwrap();
    /// assert_eq!((pairs.unique, pairs.total), (2, 6));
    /// assert!(!pairs.is_enumerated());
    /// ```
    #[instrument(skip(self, group), fields(sites = group.site_count(), id = %site_set))]
    pub fn get_unique(&self, k: usize, group: &PermutationGroup, site_set: &SiteSetId) -> Result<UniqueConfigurations, Error> {
        let n = group.site_count();
        let enumeration = enumerate(n, k, group, self.config.enum_max, self.config.workers)?;
        let total = enumeration.total_combinations;

        match enumeration.orbits {
            Some(orbits) => {
                let unique = orbits.len() as u64;
                Ok(UniqueConfigurations {orbits, unique, total})
            },
            None => {
                info!(total, "Falling back to Burnside counting");
                let unique = burnside::count(n, k, site_set, Some(group), &self.caches, self.config.formula)?;
                Ok(UniqueConfigurations {orbits: OrbitMap::new(), unique, total})
            }
        }
    }

    /// Burnside count from cached cycle data alone
    pub fn count(&self, n: usize, k: usize, site_set: &SiteSetId) -> Result<u64, Error> {
        Ok(burnside::count(n, k, site_set, None, &self.caches, self.config.formula)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::dispatch::*;
    use crate::burnside::BurnsideFormula;
    use crate::cache::{FileStore, MemoryStore};
    use crate::configuration::Configuration;
    use crate::combination::binomial;
    use crate::sites;
    use crate::symmetry::point_group;

    fn dispatcher(enum_max: u64) -> Dispatcher<MemoryStore> {
        let config = EnumerationConfig {enum_max, ..Default::default()};
        Dispatcher::new(config, MemoryStore::new()).unwrap()
    }

    #[test]
    fn reduced_sphere_regression() {
        let dispatcher = dispatcher(1000);
        let id = SiteSetId::from("reduced");
        let group = dispatcher.prepare(&id, &point_group::d4h(), &sites::reduced_sphere()).unwrap();

        let none = dispatcher.get_unique(0, &group, &id).unwrap();
        assert_eq!(none, UniqueConfigurations {
            orbits: OrbitMap::from([(Configuration(0), 1)]),
            unique: 1,
            total: 1
        });

        let single = dispatcher.get_unique(1, &group, &id).unwrap();
        assert_eq!((single.unique, single.total), (1, 8));
        assert_eq!(single.unique, group.site_orbits().len() as u64);
    }

    #[test]
    fn threshold_fallback() {
        let dispatcher = dispatcher(1);
        let id = SiteSetId::from("first");
        let group = sites::d4h_group(&sites::first_sphere());

        // C(14, 0) = 1 is still enumerated
        assert!(dispatcher.get_unique(0, &group, &id).unwrap().is_enumerated());

        for k in 1..=13 {
            let result = dispatcher.get_unique(k, &group, &id).unwrap();
            assert!(result.orbits.is_empty());
            assert!(!result.is_enumerated());
            assert_eq!(result.total, binomial(14, k));
        }
        assert_eq!(dispatcher.get_unique(7, &group, &id).unwrap().unique, 276);

        // The cache built during fallback serves later requests
        assert_eq!(dispatcher.count(14, 2, &id).unwrap(), 14);
    }

    #[test]
    fn strategies_agree() {
        let group = sites::d4h_group(&sites::first_sphere());
        let id = SiteSetId::from("first");
        let exact = dispatcher(u64::MAX);
        let algebraic = dispatcher(0);
        for k in 0..=14 {
            let enumerated = exact.get_unique(k, &group, &id).unwrap();
            let counted = algebraic.get_unique(k, &group, &id).unwrap();
            assert_eq!(enumerated.unique, counted.unique, "k = {}", k);
            assert_eq!(enumerated.total, counted.total);
            assert_eq!(enumerated.orbits.values().sum::<u64>(), enumerated.total);
        }
    }

    #[test]
    fn legacy_fallback_errors_instead_of_truncating() {
        let config = EnumerationConfig {enum_max: 0, formula: BurnsideFormula::LegacyCycleCount, ..Default::default()};
        let dispatcher = Dispatcher::new(config, MemoryStore::new()).unwrap();
        let group = sites::d4h_group(&sites::reduced_sphere());
        let result = dispatcher.get_unique(2, &group, &SiteSetId::from("legacy"));
        assert!(matches!(result, Err(Error::Burnside(BurnsideError::InconsistentGroup {..}))));
    }

    #[test]
    fn cache_rebuild_idempotence() {
        let directory = tempfile::tempdir().unwrap();
        let config = EnumerationConfig {enum_max: 10, workers: Some(2), ..Default::default()};
        let dispatcher = Dispatcher::new(config, FileStore::new(directory.path())).unwrap();
        let id = SiteSetId::from("sphere2");
        let group = dispatcher.prepare(&id, &point_group::d4h(), &sites::second_sphere()).unwrap();

        let before = dispatcher.get_unique(3, &group, &id).unwrap();
        assert_eq!(before.unique, 1068);

        std::fs::remove_file(dispatcher.caches().store().path(&id).unwrap()).unwrap();
        assert!(matches!(dispatcher.count(46, 3, &id), Err(Error::Burnside(BurnsideError::Cache(CacheError::Unavailable(_))))));
        assert_eq!(dispatcher.get_unique(3, &group, &id).unwrap(), before);
    }

    #[test]
    fn invalid_setup() {
        let config = EnumerationConfig {workers: Some(0), ..Default::default()};
        assert!(matches!(Dispatcher::new(config, MemoryStore::new()), Err(Error::Config(_))));

        let dispatcher = dispatcher(100);
        let mut coordinates = sites::reduced_sphere();
        coordinates[0] *= 1.5;
        assert!(matches!(
            dispatcher.prepare(&SiteSetId::from("distorted"), &point_group::d4h(), &coordinates),
            Err(Error::Geometry(GeometryError::Mismatch {..}))
        ));
    }
}
