//! Disk-backed virtual corpus cache with an in-memory LRU front

use super::bits::DocBits;
use super::error::CacheError;
use crate::config::compile_time::cache::{MANIFEST_FILE_NAME, MAX_CAPACITY, MAX_VC_ID_LENGTH};
use crate::config::CachePreferences;
use crate::logging::codes;
use crate::{log_debug, log_success};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Bits of one virtual corpus, keyed by leaf (segment) fingerprint
pub type LeafBits = BTreeMap<String, DocBits>;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    vc_id: String,
    updated: DateTime<Utc>,
    leaves: Vec<String>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, LeafBits>,
    /// Least recently used first
    recency: VecDeque<String>,
    marked: HashSet<String>,
}

impl CacheState {
    fn touch(&mut self, vc_id: &str) {
        if let Some(position) = self.recency.iter().position(|id| id == vc_id) {
            self.recency.remove(position);
        }
        self.recency.push_back(vc_id.to_string());
    }

    fn forget(&mut self, vc_id: &str) {
        self.entries.remove(vc_id);
        self.recency.retain(|id| id != vc_id);
    }

    fn evict_to(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            log_debug!("Evicted virtual corpus from memory", "vc" => oldest);
        }
    }
}

/// Precomputed per-leaf document bits for virtual corpora.
///
/// Entries live on disk as `<root>/<vc_id>/<leaf_fingerprint>` plus a
/// manifest per VC; at most `capacity` VCs are additionally held in memory.
/// Evicting from memory never touches disk. A VC marked for cleanup is pruned
/// to the caller's current leaves the next time it is retrieved through
/// [`VirtualCorpusCache::retrieve_for_leaves`].
#[derive(Debug)]
pub struct VirtualCorpusCache {
    root: PathBuf,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl VirtualCorpusCache {
    /// Open (creating if needed) a cache rooted at `root`; capacity is clamped to `1..=MAX_CAPACITY`
    pub fn new(root: impl Into<PathBuf>, capacity: usize) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| CacheError::io(&root, e))?;
        Ok(Self {
            root,
            capacity: capacity.clamp(1, MAX_CAPACITY),
            state: Mutex::new(CacheState::default()),
        })
    }

    pub fn from_preferences(preferences: &CachePreferences) -> Result<Self, CacheError> {
        Self::new(preferences.directory.clone(), preferences.capacity)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of VCs currently held in memory
    pub fn memory_len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_marked_for_cleanup(&self, vc_id: &str) -> bool {
        self.lock().marked.contains(vc_id)
    }

    /// Write the bits of one leaf and refresh the VC's manifest
    pub fn store(&self, vc_id: &str, leaf_fp: &str, bits: &DocBits) -> Result<(), CacheError> {
        validate_vc_id(vc_id)?;
        validate_fingerprint(leaf_fp)?;

        let mut state = self.lock();
        // The cached entry is replaced only once the disk write succeeded
        let mut entry = match state.entries.get(vc_id) {
            Some(entry) => entry.clone(),
            None => self.load(vc_id)?.unwrap_or_default(),
        };

        let dir = self.vc_dir(vc_id);
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        let path = dir.join(leaf_fp);
        fs::write(&path, bits.to_bytes()).map_err(|e| CacheError::io(&path, e))?;

        entry.insert(leaf_fp.to_string(), bits.clone());
        self.write_manifest(vc_id, &entry)?;

        state.entries.insert(vc_id.to_string(), entry);
        state.touch(vc_id);
        state.evict_to(self.capacity);

        log_success!(codes::success::CACHE_STORED, "Virtual corpus leaf cached",
            "vc" => vc_id,
            "leaf" => leaf_fp,
            "documents" => bits.cardinality()
        );
        Ok(())
    }

    /// All cached leaves of a VC, from memory or else from disk
    pub fn retrieve(&self, vc_id: &str) -> Result<Option<LeafBits>, CacheError> {
        validate_vc_id(vc_id)?;
        let mut state = self.lock();
        self.retrieve_locked(&mut state, vc_id)
    }

    pub fn retrieve_leaf(&self, vc_id: &str, leaf_fp: &str) -> Result<Option<DocBits>, CacheError> {
        validate_fingerprint(leaf_fp)?;
        Ok(self
            .retrieve(vc_id)?
            .and_then(|mut leaves| leaves.remove(leaf_fp)))
    }

    /// Retrieve a VC, first pruning leaves outside `current_leaves` if it was marked for cleanup
    pub fn retrieve_for_leaves<S: AsRef<str>>(
        &self,
        vc_id: &str,
        current_leaves: &[S],
    ) -> Result<Option<LeafBits>, CacheError> {
        validate_vc_id(vc_id)?;
        let mut state = self.lock();

        if state.marked.contains(vc_id) {
            let current: HashSet<&str> = current_leaves.iter().map(|s| s.as_ref()).collect();
            self.prune(&mut state, vc_id, &current)?;
            state.marked.remove(vc_id);
        }

        self.retrieve_locked(&mut state, vc_id)
    }

    pub fn contains(&self, vc_id: &str) -> bool {
        if validate_vc_id(vc_id).is_err() {
            return false;
        }
        self.lock().entries.contains_key(vc_id) || self.manifest_path(vc_id).is_file()
    }

    /// Remove a VC from memory and disk; deleting an unknown VC is not an error
    pub fn delete(&self, vc_id: &str) -> Result<(), CacheError> {
        validate_vc_id(vc_id)?;
        let mut state = self.lock();
        state.forget(vc_id);
        state.marked.remove(vc_id);

        let dir = self.vc_dir(vc_id);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Drop every VC from memory and disk
    pub fn reset(&self) -> Result<(), CacheError> {
        let mut state = self.lock();
        *state = CacheState::default();

        for vc_id in self.disk_vc_ids()? {
            let dir = self.vc_dir(&vc_id);
            fs::remove_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        }
        Ok(())
    }

    pub fn mark_for_cleanup(&self, vc_id: &str) -> Result<(), CacheError> {
        validate_vc_id(vc_id)?;
        self.lock().marked.insert(vc_id.to_string());
        Ok(())
    }

    /// Mark every VC known in memory or on disk
    pub fn mark_all_for_cleanup(&self) -> Result<(), CacheError> {
        let disk_ids = self.disk_vc_ids()?;
        let mut state = self.lock();
        let memory_ids: Vec<String> = state.entries.keys().cloned().collect();
        state.marked.extend(memory_ids);
        state.marked.extend(disk_ids);
        Ok(())
    }

    fn retrieve_locked(
        &self,
        state: &mut CacheState,
        vc_id: &str,
    ) -> Result<Option<LeafBits>, CacheError> {
        if let Some(entry) = state.entries.get(vc_id) {
            let entry = entry.clone();
            state.touch(vc_id);
            return Ok(Some(entry));
        }

        let Some(entry) = self.load(vc_id)? else {
            return Ok(None);
        };

        state.entries.insert(vc_id.to_string(), entry.clone());
        state.touch(vc_id);
        state.evict_to(self.capacity);

        log_success!(codes::success::CACHE_RETRIEVED, "Virtual corpus loaded from disk",
            "vc" => vc_id,
            "leaves" => entry.len()
        );
        Ok(Some(entry))
    }

    fn prune(
        &self,
        state: &mut CacheState,
        vc_id: &str,
        current: &HashSet<&str>,
    ) -> Result<(), CacheError> {
        let mut entry = match state.entries.remove(vc_id) {
            Some(entry) => entry,
            None => match self.load(vc_id)? {
                Some(entry) => entry,
                None => return Ok(()),
            },
        };
        state.forget(vc_id);

        let stale: Vec<String> = entry
            .keys()
            .filter(|leaf| !current.contains(leaf.as_str()))
            .cloned()
            .collect();

        for leaf in &stale {
            entry.remove(leaf);
            let path = self.vc_dir(vc_id).join(leaf);
            if path.exists() {
                fs::remove_file(&path).map_err(|e| CacheError::io(&path, e))?;
            }
        }

        if entry.is_empty() {
            let dir = self.vc_dir(vc_id);
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
            }
        } else {
            self.write_manifest(vc_id, &entry)?;
            state.entries.insert(vc_id.to_string(), entry);
            state.touch(vc_id);
        }

        log_success!(codes::success::CACHE_CLEANED, "Stale virtual corpus leaves removed",
            "vc" => vc_id,
            "removed" => stale.len()
        );
        Ok(())
    }

    fn load(&self, vc_id: &str) -> Result<Option<LeafBits>, CacheError> {
        let manifest_path = self.manifest_path(vc_id);
        if !manifest_path.is_file() {
            return Ok(None);
        }

        let content =
            fs::read(&manifest_path).map_err(|e| CacheError::io(&manifest_path, e))?;
        let manifest: Manifest =
            serde_json::from_slice(&content).map_err(|source| CacheError::Manifest {
                path: manifest_path.clone(),
                source,
            })?;

        if manifest.vc_id != vc_id {
            return Err(CacheError::CorruptEntry {
                path: manifest_path,
                reason: format!("manifest belongs to '{}'", manifest.vc_id),
            });
        }

        let mut entry = LeafBits::new();
        for leaf in manifest.leaves {
            validate_fingerprint(&leaf)?;
            let path = self.vc_dir(vc_id).join(&leaf);
            let bytes = fs::read(&path).map_err(|e| CacheError::io(&path, e))?;
            entry.insert(leaf, DocBits::from_bytes(&bytes, &path)?);
        }
        Ok(Some(entry))
    }

    fn write_manifest(&self, vc_id: &str, entry: &LeafBits) -> Result<(), CacheError> {
        let path = self.manifest_path(vc_id);
        let manifest = Manifest {
            vc_id: vc_id.to_string(),
            updated: Utc::now(),
            leaves: entry.keys().cloned().collect(),
        };
        let json = serde_json::to_vec_pretty(&manifest).map_err(|source| CacheError::Manifest {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|e| CacheError::io(&path, e))
    }

    fn disk_vc_ids(&self) -> Result<Vec<String>, CacheError> {
        let entries = fs::read_dir(&self.root).map_err(|e| CacheError::io(&self.root, e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&self.root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_vc_id(name).is_ok() {
                    ids.push(name.to_string());
                }
            }
        }
        Ok(ids)
    }

    fn vc_dir(&self, vc_id: &str) -> PathBuf {
        self.root.join(vc_id)
    }

    fn manifest_path(&self, vc_id: &str) -> PathBuf {
        self.vc_dir(vc_id).join(MANIFEST_FILE_NAME)
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_VC_ID_LENGTH
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
}

fn validate_vc_id(vc_id: &str) -> Result<(), CacheError> {
    if is_safe_name(vc_id) {
        Ok(())
    } else {
        Err(CacheError::InvalidVcId {
            id: vc_id.to_string(),
        })
    }
}

fn validate_fingerprint(fingerprint: &str) -> Result<(), CacheError> {
    if is_safe_name(fingerprint) && fingerprint != MANIFEST_FILE_NAME {
        Ok(())
    } else {
        Err(CacheError::InvalidFingerprint {
            fingerprint: fingerprint.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn cache(capacity: usize) -> (TempDir, VirtualCorpusCache) {
        let dir = TempDir::new().unwrap();
        let cache = VirtualCorpusCache::new(dir.path().join("vc"), capacity).unwrap();
        (dir, cache)
    }

    #[test]
    fn test_store_and_retrieve() {
        let (_dir, cache) = cache(4);
        let bits = DocBits::from_indices(10, [1, 3, 5]);
        cache.store("vc-1", "leaf-a", &bits).unwrap();

        assert!(cache.contains("vc-1"));
        assert_eq!(cache.retrieve_leaf("vc-1", "leaf-a").unwrap(), Some(bits));
        assert_eq!(cache.retrieve_leaf("vc-1", "leaf-b").unwrap(), None);
        assert_eq!(cache.retrieve("missing").unwrap(), None);

        let manifest = fs::read_to_string(cache.root().join("vc-1").join(MANIFEST_FILE_NAME)).unwrap();
        assert!(manifest.contains("\"leaf-a\""));
    }

    #[test]
    fn test_disk_survives_new_instance() {
        let dir = TempDir::new().unwrap();
        let bits = DocBits::from_indices(70, [0, 69]);
        {
            let cache = VirtualCorpusCache::new(dir.path(), 2).unwrap();
            cache.store("corpus:x", "seg_1", &bits).unwrap();
            cache.store("corpus:x", "seg_2", &DocBits::new(3)).unwrap();
        }

        let cache = VirtualCorpusCache::new(dir.path(), 2).unwrap();
        assert_eq!(cache.memory_len(), 0);
        let leaves = cache.retrieve("corpus:x").unwrap().unwrap();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves["seg_1"], bits);
        assert_eq!(cache.memory_len(), 1);
    }

    #[test]
    fn test_failed_write_keeps_cached_entry() {
        let (_dir, cache) = cache(4);
        let bits = DocBits::from_indices(8, [2]);
        cache.store("vc-1", "leaf-a", &bits).unwrap();

        // A directory in place of the leaf file makes the write fail
        fs::create_dir(cache.root().join("vc-1").join("leaf-b")).unwrap();
        assert_matches!(
            cache.store("vc-1", "leaf-b", &DocBits::new(8)),
            Err(CacheError::Io { .. })
        );

        assert_eq!(cache.memory_len(), 1);
        let leaves = cache.retrieve("vc-1").unwrap().unwrap();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves["leaf-a"], bits);
    }

    #[test]
    fn test_memory_eviction_keeps_disk() {
        let (_dir, cache) = cache(2);
        for id in ["a", "b", "c"] {
            cache.store(id, "leaf", &DocBits::new(8)).unwrap();
        }

        assert_eq!(cache.memory_len(), 2);
        assert!(cache.contains("a"));
        assert!(cache.retrieve("a").unwrap().is_some());
        assert_eq!(cache.memory_len(), 2);
    }

    #[test]
    fn test_invalid_ids_rejected() {
        let (_dir, cache) = cache(2);
        let bits = DocBits::new(1);

        assert_matches!(cache.store("../etc", "leaf", &bits), Err(CacheError::InvalidVcId { .. }));
        assert_matches!(cache.store("..", "leaf", &bits), Err(CacheError::InvalidVcId { .. }));
        assert_matches!(cache.store("", "leaf", &bits), Err(CacheError::InvalidVcId { .. }));
        assert_matches!(
            cache.store("ok", MANIFEST_FILE_NAME, &bits),
            Err(CacheError::InvalidFingerprint { .. })
        );
        assert_matches!(
            cache.store("ok", "a/b", &bits),
            Err(CacheError::InvalidFingerprint { .. })
        );
        assert!(!cache.contains("a/b"));
        assert_eq!(
            CacheError::InvalidVcId { id: String::new() }.error_code().as_str(),
            "E501"
        );
    }

    #[test]
    fn test_cleanup_on_use() {
        let (_dir, cache) = cache(4);
        cache.store("vc", "old", &DocBits::new(4)).unwrap();
        cache.store("vc", "kept", &DocBits::from_indices(4, [2])).unwrap();

        // Unmarked: current leaves are ignored
        let leaves = cache.retrieve_for_leaves("vc", &["kept"]).unwrap().unwrap();
        assert_eq!(leaves.len(), 2);

        cache.mark_for_cleanup("vc").unwrap();
        assert!(cache.is_marked_for_cleanup("vc"));
        let leaves = cache.retrieve_for_leaves("vc", &["kept", "new"]).unwrap().unwrap();
        assert_eq!(leaves.keys().collect::<Vec<_>>(), vec!["kept"]);
        assert!(!cache.is_marked_for_cleanup("vc"));
        assert!(!cache.root().join("vc").join("old").exists());

        let reopened = VirtualCorpusCache::new(cache.root(), 4).unwrap();
        assert_eq!(reopened.retrieve("vc").unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_cleanup_of_all_leaves_removes_vc() {
        let (_dir, cache) = cache(4);
        cache.store("vc", "old", &DocBits::new(4)).unwrap();
        cache.store("other", "leaf", &DocBits::new(4)).unwrap();

        cache.mark_all_for_cleanup().unwrap();
        assert!(cache.is_marked_for_cleanup("other"));
        let empty: [&str; 0] = [];
        assert_eq!(cache.retrieve_for_leaves("vc", &empty).unwrap(), None);
        assert!(!cache.contains("vc"));
        assert!(cache.contains("other"));
    }

    #[test]
    fn test_delete_and_reset() {
        let (_dir, cache) = cache(4);
        cache.store("a", "leaf", &DocBits::new(4)).unwrap();
        cache.store("b", "leaf", &DocBits::new(4)).unwrap();

        cache.delete("a").unwrap();
        cache.delete("never-stored").unwrap();
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));

        cache.reset().unwrap();
        assert!(!cache.contains("b"));
        assert_eq!(cache.memory_len(), 0);
        assert!(cache.root().exists());
    }

    #[test]
    fn test_corrupt_manifest() {
        let (_dir, cache) = cache(4);
        cache.store("vc", "leaf", &DocBits::new(4)).unwrap();
        fs::write(cache.root().join("vc").join(MANIFEST_FILE_NAME), "{not json").unwrap();

        let reopened = VirtualCorpusCache::new(cache.root(), 4).unwrap();
        assert_matches!(reopened.retrieve("vc"), Err(CacheError::Manifest { .. }));
    }

    #[test]
    fn test_capacity_is_clamped() {
        let (_dir, cache) = cache(0);
        assert_eq!(cache.capacity(), 1);
    }
}
