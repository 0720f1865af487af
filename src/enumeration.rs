use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::combination::{binomial, slices, SubsetRange};
use crate::configuration::{Canonicalizer, Configuration, MAX_SITES};
use crate::group::PermutationGroup;

/// Canonical configurations and their degeneracies
pub type OrbitMap = BTreeMap<Configuration, u64>;

#[derive(Error, Debug)]
pub enum EnumerationError {
    #[error("{0} sites exceed the supported maximum of {}", MAX_SITES)]
    TooManySites(usize),
    #[error("Group acts on {group} sites, but {requested} sites were requested")]
    SiteCountMismatch {group: usize, requested: usize},
    #[error("At least one worker is required")]
    NoWorkers,
    #[error("Could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Outcome of an exact enumeration attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    /// Canonical forms with degeneracies, `None` if enumeration was skipped
    pub orbits: Option<OrbitMap>,
    /// C(N, k)
    pub total_combinations: u64
}

impl Enumeration {
    /// Number of symmetry-distinct configurations, if enumerated
    pub fn unique_count(&self) -> Option<u64> {
        self.orbits.as_ref().map(|orbits| orbits.len() as u64)
    }
}

fn tally(n: usize, k: usize, range: Range<u64>, canonicalizer: &Canonicalizer) -> HashMap<Configuration, u64> {
    let mut seen = HashMap::new();
    for configuration in SubsetRange::new(n, k, range) {
        *seen.entry(canonicalizer.canonical(configuration)).or_insert(0) += 1;
    }
    seen
}

fn merge(mut a: HashMap<Configuration, u64>, mut b: HashMap<Configuration, u64>) -> HashMap<Configuration, u64> {
    if a.len() < b.len() {
        std::mem::swap(&mut a, &mut b);
    }
    for (canonical, count) in b {
        *a.entry(canonical).or_insert(0) += count;
    }
    a
}

/// Enumerate all placements of `k` marked sites among `n` up to symmetry
///
/// If C(n, k) exceeds `enum_max`, nothing is enumerated and only the total is
/// returned. Otherwise the lexicographic index space of k-subsets is cut into
/// one contiguous slice per worker. Each worker canonicalizes the subsets of
/// its slice and counts occurrences per canonical form. The merged counts are
/// the orbit sizes and sum to C(n, k).
///
/// With `workers` unset, the current rayon pool's thread count is used.
///
/// ```
/// # use orbitcount::enumeration::enumerate;
/// # use orbitcount::group::PermutationGroup;
/// # use orbitcount::configuration::Configuration;
/// // Cyclic rotations of a square
/// let c4 = PermutationGroup::new(vec![
///     vec![0, 1, 2, 3], vec![1, 2, 3, 0], vec![2, 3, 0, 1], vec![3, 0, 1, 2],
/// ]).unwrap();
/// let result = enumerate(4, 2, &c4, 1000, Some(2)).unwrap();
/// let orbits = result.orbits.unwrap();
/// assert_eq!(result.total_combinations, 6);
/// assert_eq!(orbits.get(&Configuration(0b0011)), Some(&4)); // adjacent
/// assert_eq!(orbits.get(&Configuration(0b0101)), Some(&2)); // opposite
///
/// assert_eq!(enumerate(4, 2, &c4, 5, None).unwrap().orbits, None);
/// ```
#[instrument(skip(group), fields(order = group.order()))]
pub fn enumerate(n: usize, k: usize, group: &PermutationGroup, enum_max: u64, workers: Option<usize>) -> Result<Enumeration, EnumerationError> {
    if n > MAX_SITES {
        return Err(EnumerationError::TooManySites(n));
    }
    if group.site_count() != n {
        return Err(EnumerationError::SiteCountMismatch {group: group.site_count(), requested: n});
    }
    if workers == Some(0) {
        return Err(EnumerationError::NoWorkers);
    }

    let total_combinations = binomial(n, k);
    if total_combinations > enum_max {
        info!(total_combinations, enum_max, "Too many combinations to enumerate");
        return Ok(Enumeration {orbits: None, total_combinations});
    }

    let canonicalizer = Canonicalizer::new(group.permutations());
    let parts = workers.unwrap_or_else(rayon::current_num_threads);
    let ranges = slices(total_combinations, parts);
    debug!(parts, "Enumerating combinations in slices");

    let run = || {
        ranges.par_iter()
            .map(|range| tally(n, k, range.clone(), &canonicalizer))
            .reduce(HashMap::new, merge)
    };

    let merged = match workers {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(run),
        None => run()
    };

    let orbits: OrbitMap = merged.into_iter().collect();
    debug_assert_eq!(orbits.values().sum::<u64>(), total_combinations);
    info!(unique = orbits.len(), total_combinations, "Enumeration finished");

    Ok(Enumeration {orbits: Some(orbits), total_combinations})
}
