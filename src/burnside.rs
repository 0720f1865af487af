use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::cache::{CacheError, CacheStore, CycleCache, CycleCacheManager, SiteSetId};
use crate::combination::binomial;
use crate::configuration::MAX_SITES;
use crate::group::PermutationGroup;

/// How the number of k-subsets fixed by a permutation is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnsideFormula {
    /// Subsets of cycles whose lengths sum to k. Exact for every group.
    #[default]
    CycleLengths,
    /// C(cycle count, k), kept for compatibility testing. Only agrees with
    /// enumeration if all cycles are fixed points.
    LegacyCycleCount
}

#[derive(Error, Debug)]
pub enum BurnsideError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// Fixed point sum not divisible by the group order
    #[error("Fixed point sum {sum} is not divisible by group order {order}")]
    InconsistentGroup {sum: u128, order: usize},
    #[error("Cycle data covers {cached} sites, but {requested} sites were requested")]
    SiteCountMismatch {cached: usize, requested: usize},
    #[error("{0} sites exceed the supported maximum of {}", MAX_SITES)]
    TooManySites(usize),
}

/// Number of k-subsets of sites left invariant by a permutation of a given
/// cycle type
///
/// A subset is invariant exactly if it is a union of whole cycles, so this is
/// the coefficient of x^k in the product over cycles of (1 + x^length).
///
/// ```
/// # use orbitcount::burnside::fixed_subsets;
/// // Two 4-cycles: only the empty set, either cycle or both
/// assert_eq!(fixed_subsets(&[4, 4], 0), 1);
/// assert_eq!(fixed_subsets(&[4, 4], 1), 0);
/// assert_eq!(fixed_subsets(&[4, 4], 4), 2);
/// assert_eq!(fixed_subsets(&[4, 4], 8), 1);
/// ```
pub fn fixed_subsets(cycle_lengths: &[usize], k: usize) -> u64 {
    if k > cycle_lengths.iter().sum::<usize>() {
        return 0;
    }

    let mut coefficients = vec![0u64; k + 1];
    coefficients[0] = 1;
    for &length in cycle_lengths {
        for s in (length..=k).rev() {
            coefficients[s] += coefficients[s - length];
        }
    }
    coefficients[k]
}

/// Orbit count from cached cycle data
pub fn count_from_cache(cache: &CycleCache, n: usize, k: usize, formula: BurnsideFormula) -> Result<u64, BurnsideError> {
    if cache.site_count != n {
        return Err(BurnsideError::SiteCountMismatch {cached: cache.site_count, requested: n});
    }

    let sum: u128 = match formula {
        BurnsideFormula::CycleLengths => cache.cycle_lengths.iter()
            .map(|lengths| fixed_subsets(lengths, k) as u128)
            .sum(),
        BurnsideFormula::LegacyCycleCount => cache.cycle_counts.iter()
            .map(|&count| binomial(count, k) as u128)
            .sum()
    };

    let order = cache.group_order;
    if sum % order as u128 != 0 {
        return Err(BurnsideError::InconsistentGroup {sum, order});
    }

    // The quotient never exceeds C(n, k)
    Ok((sum / order as u128) as u64)
}

/// Count symmetry-distinct placements of `k` marked sites among `n` with
/// Burnside's lemma, without enumerating them
///
/// The orbit count is the group average of the number of subsets each
/// permutation leaves invariant. Cycle data comes from the cache of the site
/// set, built from `group` if missing.
///
/// ```
/// # use orbitcount::burnside::{count, BurnsideFormula};
/// # use orbitcount::cache::{CycleCacheManager, MemoryStore};
/// # use orbitcount::group::PermutationGroup;
/// let c4 = PermutationGroup::new(vec![
///     vec![0, 1, 2, 3], vec![1, 2, 3, 0], vec![2, 3, 0, 1], vec![3, 0, 1, 2],
/// ]).unwrap();
/// let caches = CycleCacheManager::new(MemoryStore::new());
/// let id = "square".into();
/// let unique = count(4, 2, &id, Some(&c4), &caches, BurnsideFormula::CycleLengths).unwrap();
/// assert_eq!(unique, 2);
/// ```
#[instrument(skip(group, caches), fields(id = %site_set))]
pub fn count<S: CacheStore>(
    n: usize,
    k: usize,
    site_set: &SiteSetId,
    group: Option<&PermutationGroup>,
    caches: &CycleCacheManager<S>,
    formula: BurnsideFormula
) -> Result<u64, BurnsideError> {
    if n > MAX_SITES {
        return Err(BurnsideError::TooManySites(n));
    }

    let cache = caches.get_or_build(site_set, group)?;
    let unique = count_from_cache(&cache, n, k, formula)?;
    debug!(unique, "Counted orbits from cycle data");
    Ok(unique)
}
