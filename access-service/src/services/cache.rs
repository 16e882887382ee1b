//! Versioned process-wide cache used by the membership sets.
//!
//! A cache holds one fully-built value at a version. `invalidate` bumps
//! the version counter; the next reader that sees a stale slot rebuilds
//! under an async lock while concurrent readers queue on the same build.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::services::error::AccessError;

struct CacheSlot<T> {
    version: u64,
    value: Arc<T>,
}

pub struct VersionedCache<T> {
    version: AtomicU64,
    slot: RwLock<Option<CacheSlot<T>>>,
    build_lock: tokio::sync::Mutex<()>,
}

impl<T> Default for VersionedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> VersionedCache<T> {
    pub fn new() -> Self {
        Self {
            version: AtomicU64::new(0),
            slot: RwLock::new(None),
            build_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Current version. Bumped on every invalidation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Mark any built value stale. Cheap; the rebuild happens on the next
    /// read.
    pub fn invalidate(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Return the cached value, building it if absent or stale.
    ///
    /// The build runs at most once per version: concurrent callers wait
    /// on the build lock and pick up the fresh slot. The read guard is
    /// never held across an await point.
    pub async fn get_or_build<F, Fut>(&self, build: F) -> Result<Arc<T>, AccessError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AccessError>>,
    {
        let current = self.version.load(Ordering::SeqCst);
        if let Some(value) = self.read_slot(current)? {
            return Ok(value);
        }

        let _guard = self.build_lock.lock().await;

        // Another caller may have rebuilt while we waited for the lock,
        // and the version may have moved again.
        let current = self.version.load(Ordering::SeqCst);
        if let Some(value) = self.read_slot(current)? {
            return Ok(value);
        }

        let value = Arc::new(build().await?);
        let mut slot = self.slot.write().map_err(|e| {
            AccessError::Persistence(anyhow::anyhow!("Cache slot lock poisoned: {}", e))
        })?;
        *slot = Some(CacheSlot {
            version: current,
            value: value.clone(),
        });
        Ok(value)
    }

    fn read_slot(&self, version: u64) -> Result<Option<Arc<T>>, AccessError> {
        let slot = self.slot.read().map_err(|e| {
            AccessError::Persistence(anyhow::anyhow!("Cache slot lock poisoned: {}", e))
        })?;
        Ok(slot
            .as_ref()
            .filter(|s| s.version == version)
            .map(|s| s.value.clone()))
    }
}
