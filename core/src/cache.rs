//! Interning cache for compiled dictionaries.
//!
//! Dictionaries are keyed by file identity (device + inode where the
//! platform gives us one, canonical path otherwise) so two spellers
//! loading the same main dictionary share one copy. The cache holds weak
//! handles: an entry dies when the last speller drops its `Arc`, and the
//! next load rebuilds it. One mutex is plenty; loads are rare next to
//! lookups, and lookups never touch the cache.

use crate::error::{Error, Result};
use crate::readonly::ReadOnlyDict;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Node(u64, u64),
    Path(PathBuf),
}

fn cache_key(path: &Path) -> Result<CacheKey> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Ok(meta) = std::fs::metadata(path) {
            return Ok(CacheKey::Node(meta.dev(), meta.ino()));
        }
    }
    let canon = path
        .canonicalize()
        .map_err(|e| Error::io(path, e))?;
    Ok(CacheKey::Path(canon))
}

#[derive(Default)]
pub struct DictCache {
    inner: Mutex<AHashMap<CacheKey, Weak<ReadOnlyDict>>>,
}

impl DictCache {
    pub fn new() -> DictCache {
        DictCache::default()
    }

    /// Load a compiled dictionary through this cache, resolving its
    /// language relative to `data_dir`.
    pub fn get(&self, path: &Path, data_dir: &Path) -> Result<Arc<ReadOnlyDict>> {
        let key = cache_key(path)?;
        let mut inner = self.inner.lock().expect("dict cache poisoned");
        if let Some(weak) = inner.get(&key) {
            if let Some(dict) = weak.upgrade() {
                debug!(file = %path.display(), "dictionary cache hit");
                return Ok(dict);
            }
        }
        let dict = Arc::new(ReadOnlyDict::load(path, data_dir)?);
        inner.insert(key, Arc::downgrade(&dict));
        Ok(dict)
    }

    /// Entries still alive (weak handles someone holds strongly).
    pub fn live(&self) -> usize {
        self.inner
            .lock()
            .expect("dict cache poisoned")
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

static GLOBAL_CACHE: Lazy<DictCache> = Lazy::new(DictCache::new);

/// The process-wide cache most spellers share; tests build their own
/// [`DictCache`] when they need isolation.
pub fn global() -> &'static DictCache {
    &GLOBAL_CACHE
}
