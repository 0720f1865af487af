use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::group::PermutationGroup;

/// Identity of a site set, distinguishing cached cycle data between geometries
#[derive(Debug, Display, From, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteSetId(String);

impl From<&str> for SiteSetId {
    fn from(id: &str) -> Self {
        SiteSetId(id.to_owned())
    }
}

impl SiteSetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    /// No cached cycle data and nothing to build it from
    #[error("Cycle cache for site set '{0}' unavailable and no permutations supplied to build it")]
    Unavailable(SiteSetId),
    #[error("Cycle cache for site set '{id}' is inconsistent: {reason}")]
    Corrupted {id: SiteSetId, reason: String},
    #[error("Site set identifier '{0}' cannot be used as a file name")]
    InvalidKey(SiteSetId),
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed cache file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not serialize cache: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Per-permutation cycle structure of a permutation group
///
/// Everything Burnside counting needs without the permutations themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleCache {
    pub site_count: usize,
    pub group_order: usize,
    /// Number of disjoint cycles of each permutation
    pub cycle_counts: Vec<usize>,
    /// Ascending cycle lengths of each permutation
    pub cycle_lengths: Vec<Vec<usize>>
}

impl CycleCache {
    pub fn from_group(group: &PermutationGroup) -> CycleCache {
        let permutations = group.permutations();
        CycleCache {
            site_count: group.site_count(),
            group_order: group.order(),
            cycle_counts: permutations.iter().map(|p| p.cycle_count()).collect(),
            cycle_lengths: permutations.iter().map(|p| p.cycle_lengths()).collect()
        }
    }

    /// Describe the first internal inconsistency, if any
    pub fn inconsistency(&self) -> Option<String> {
        if self.group_order == 0 {
            return Some("group order is zero".into());
        }
        if self.cycle_counts.len() != self.group_order || self.cycle_lengths.len() != self.group_order {
            return Some(format!(
                "{} cycle counts and {} cycle types for group order {}",
                self.cycle_counts.len(), self.cycle_lengths.len(), self.group_order
            ));
        }

        self.cycle_counts.iter()
            .zip(self.cycle_lengths.iter())
            .enumerate()
            .find_map(|(i, (&count, lengths))| {
                if count != lengths.len() {
                    Some(format!("permutation {} has {} cycles but {} cycle lengths", i, count, lengths.len()))
                } else if lengths.iter().sum::<usize>() != self.site_count || lengths.contains(&0) {
                    Some(format!("cycle lengths of permutation {} do not partition {} sites", i, self.site_count))
                } else {
                    None
                }
            })
    }
}

/// Persistence backend for cycle caches
pub trait CacheStore: Send + Sync {
    fn load(&self, id: &SiteSetId) -> Result<Option<CycleCache>, CacheError>;
    fn save(&self, id: &SiteSetId, cache: &CycleCache) -> Result<(), CacheError>;
    /// Drop a cache entry, returning whether one existed
    fn remove(&self, id: &SiteSetId) -> Result<bool, CacheError>;
}

/// One TOML file per site set in a directory
///
/// Files are written to a temporary sibling and renamed into place, so
/// concurrent builders never expose a partially written cache.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf
}

impl FileStore {
    pub fn new(directory: impl Into<PathBuf>) -> FileStore {
        FileStore {directory: directory.into()}
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path(&self, id: &SiteSetId) -> Result<PathBuf, CacheError> {
        let valid = !id.as_str().is_empty() && id.as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid || id.as_str().starts_with('.') {
            return Err(CacheError::InvalidKey(id.clone()));
        }
        Ok(self.directory.join(format!("burnside.{}.cycles.toml", id)))
    }
}

impl CacheStore for FileStore {
    fn load(&self, id: &SiteSetId) -> Result<Option<CycleCache>, CacheError> {
        let path = self.path(id)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into())
        };
        debug!(path = %path.display(), "Read cycle cache");
        Ok(Some(toml::from_str(&contents)?))
    }

    fn save(&self, id: &SiteSetId, cache: &CycleCache) -> Result<(), CacheError> {
        let path = self.path(id)?;
        std::fs::create_dir_all(&self.directory)?;
        let contents = toml::to_string(cache)?;

        let mut file = NamedTempFile::new_in(&self.directory)?;
        file.write_all(contents.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| e.error)?;
        debug!(path = %path.display(), "Wrote cycle cache");
        Ok(())
    }

    fn remove(&self, id: &SiteSetId) -> Result<bool, CacheError> {
        match std::fs::remove_file(self.path(id)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into())
        }
    }
}

/// Volatile store, e.g. for tests or single-process use
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<SiteSetId, CycleCache>>
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<SiteSetId, CycleCache>> {
        // Entries are replaced whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, id: &SiteSetId) -> Result<Option<CycleCache>, CacheError> {
        Ok(self.entries().get(id).cloned())
    }

    fn save(&self, id: &SiteSetId, cache: &CycleCache) -> Result<(), CacheError> {
        self.entries().insert(id.clone(), cache.clone());
        Ok(())
    }

    fn remove(&self, id: &SiteSetId) -> Result<bool, CacheError> {
        Ok(self.entries().remove(id).is_some())
    }
}

/// Sole writer of cycle caches, building them on demand
pub struct CycleCacheManager<S: CacheStore> {
    store: S
}

impl<S: CacheStore> CycleCacheManager<S> {
    pub fn new(store: S) -> CycleCacheManager<S> {
        CycleCacheManager {store}
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn checked(id: &SiteSetId, cache: CycleCache) -> Result<CycleCache, CacheError> {
        match cache.inconsistency() {
            Some(reason) => Err(CacheError::Corrupted {id: id.clone(), reason}),
            None => Ok(cache)
        }
    }

    /// Fetch an existing cache without building
    pub fn get(&self, id: &SiteSetId) -> Result<CycleCache, CacheError> {
        let cache = self.store.load(id)?.ok_or_else(|| CacheError::Unavailable(id.clone()))?;
        Self::checked(id, cache)
    }

    /// Fetch the cache for a site set, building and persisting it from the
    /// group if absent
    ///
    /// ```
    /// # use orbitcount::cache::{CycleCacheManager, MemoryStore, CacheError};
    /// # use orbitcount::group::PermutationGroup;
    /// let manager = CycleCacheManager::new(MemoryStore::new());
    /// let id = "square".into();
    /// assert!(matches!(manager.get_or_build(&id, None), Err(CacheError::Unavailable(_))));
    ///
    /// let c2 = PermutationGroup::new(vec![vec![0, 1, 2, 3], vec![2, 3, 0, 1]]).unwrap();
    /// let cache = manager.get_or_build(&id, Some(&c2)).unwrap();
    /// assert_eq!(cache.cycle_counts, vec![4, 2]);
    /// assert_eq!(manager.get_or_build(&id, None).unwrap(), cache);
    /// ```
    #[instrument(skip_all, fields(id = %id))]
    pub fn get_or_build(&self, id: &SiteSetId, group: Option<&PermutationGroup>) -> Result<CycleCache, CacheError> {
        if let Some(cache) = self.store.load(id)? {
            return Self::checked(id, cache);
        }

        let group = group.ok_or_else(|| CacheError::Unavailable(id.clone()))?;
        info!(order = group.order(), sites = group.site_count(), "Building cycle cache");
        let cache = CycleCache::from_group(group);
        self.store.save(id, &cache)?;
        Ok(cache)
    }

    /// Delete the cache of a site set so that the next access rebuilds it
    pub fn invalidate(&self, id: &SiteSetId) -> Result<bool, CacheError> {
        let existed = self.store.remove(id)?;
        if existed {
            warn!(id = %id, "Invalidated cycle cache");
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::*;
    use crate::sites;

    #[test]
    fn cycle_data() {
        let group = sites::d4h_group(&sites::reduced_sphere());
        let cache = CycleCache::from_group(&group);
        assert_eq!(cache.group_order, 16);
        assert_eq!(cache.site_count, 8);
        assert_eq!(cache.cycle_counts, vec![8, 2, 2, 4, 4, 4, 4, 4, 4, 2, 2, 4, 6, 6, 4, 4]);
        assert_eq!(cache.cycle_lengths[0], vec![1; 8]);
        assert_eq!(cache.cycle_lengths[12], vec![1, 1, 1, 1, 2, 2]);
        assert_eq!(cache.inconsistency(), None);

        let mut broken = cache.clone();
        broken.cycle_counts[3] = 5;
        assert!(broken.inconsistency().is_some());
        broken = cache.clone();
        broken.group_order = 8;
        assert!(broken.inconsistency().is_some());
        broken = cache;
        broken.cycle_lengths[1] = vec![4, 3];
        assert!(broken.inconsistency().is_some());
    }

    #[test]
    fn file_store_round_trip() {
        let directory = tempfile::tempdir().unwrap();
        let store = FileStore::new(directory.path());
        let id = SiteSetId::from("sphere3");
        assert_eq!(store.load(&id).unwrap(), None);

        let cache = CycleCache::from_group(&sites::d4h_group(&sites::first_sphere()));
        store.save(&id, &cache).unwrap();
        assert!(directory.path().join("burnside.sphere3.cycles.toml").exists());
        assert_eq!(store.load(&id).unwrap(), Some(cache.clone()));

        // Overwriting leaves exactly one file behind
        store.save(&id, &cache).unwrap();
        assert_eq!(std::fs::read_dir(directory.path()).unwrap().count(), 1);

        assert!(store.remove(&id).unwrap());
        assert!(!store.remove(&id).unwrap());
        assert_eq!(store.load(&id).unwrap(), None);
    }

    #[test]
    fn rejects_path_like_keys() {
        let store = FileStore::new("/tmp");
        for key in ["../escape", "a/b", "", ".hidden"] {
            assert!(matches!(store.path(&SiteSetId::from(key)), Err(CacheError::InvalidKey(_))));
        }
        assert!(store.path(&SiteSetId::from(String::from("sphere-2_v1"))).is_ok());
    }

    #[test]
    fn malformed_file() {
        let directory = tempfile::tempdir().unwrap();
        let store = FileStore::new(directory.path());
        let id = SiteSetId::from("bad");
        std::fs::write(store.path(&id).unwrap(), "group_order = \"sixteen\"").unwrap();
        assert!(matches!(store.load(&id), Err(CacheError::Parse(_))));
    }

    #[test]
    fn manager_builds_once() {
        let manager = CycleCacheManager::new(MemoryStore::new());
        let id = SiteSetId::from("reduced");
        assert!(matches!(manager.get(&id), Err(CacheError::Unavailable(_))));
        assert!(matches!(manager.get_or_build(&id, None), Err(CacheError::Unavailable(_))));

        let group = sites::d4h_group(&sites::reduced_sphere());
        let built = manager.get_or_build(&id, Some(&group)).unwrap();
        assert_eq!(manager.get(&id).unwrap(), built);

        // An existing cache is never rebuilt from a different group
        let other = sites::d4h_group(&sites::first_sphere());
        assert_eq!(manager.get_or_build(&id, Some(&other)).unwrap(), built);

        assert!(manager.invalidate(&id).unwrap());
        assert!(!manager.invalidate(&id).unwrap());
        assert_eq!(manager.get_or_build(&id, Some(&group)).unwrap(), built);
    }

    #[test]
    fn corrupted_cache_is_reported() {
        let manager = CycleCacheManager::new(MemoryStore::new());
        let id = SiteSetId::from("tampered");
        let mut cache = CycleCache::from_group(&sites::d4h_group(&sites::reduced_sphere()));
        cache.cycle_counts.pop();
        manager.store().save(&id, &cache).unwrap();
        assert!(matches!(manager.get(&id), Err(CacheError::Corrupted {..})));
    }

    #[test]
    fn concurrent_builders() {
        let directory = tempfile::tempdir().unwrap();
        let group = sites::d4h_group(&sites::second_sphere());
        let id = SiteSetId::from("sphere2");

        let caches: Vec<CycleCache> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| {
                let manager = CycleCacheManager::new(FileStore::new(directory.path()));
                manager.get_or_build(&id, Some(&group)).unwrap()
            })).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(caches.windows(2).all(|w| w[0] == w[1]));
        let reread = CycleCacheManager::new(FileStore::new(directory.path())).get(&id).unwrap();
        assert_eq!(reread, caches[0]);
    }
}
