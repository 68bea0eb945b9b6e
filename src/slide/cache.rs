//! Bounded pool of opened slide handles.
//!
//! Opening a slide parses its metadata and maps its pyramid, so handles are kept
//! open between requests. The pool is keyed by entry-point path and holds at
//! most `capacity` handles. When a new slide must be opened and the pool is
//! full, one resident handle is evicted:
//!
//! - [`EvictionPolicy::Fifo`] (default): the first-inserted handle, regardless
//!   of how recently it was used.
//! - [`EvictionPolicy::Lru`]: the least recently used handle.
//!
//! # Concurrency
//!
//! A single mutex guards the map. The decode engine's `open` runs outside the
//! critical section, so two requests for the same cold slide may both open it.
//! The first to re-acquire the lock stores its handle; the other handle is
//! dropped and the resident one is returned instead.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use tracing::{debug, info};

use super::engine::DecodeEngine;
use crate::error::EngineError;

/// Default number of resident handles.
pub const DEFAULT_HANDLE_CACHE_CAPACITY: usize = 5;

/// Which resident handle makes room for a new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Evict the first-inserted handle. Lookups do not refresh position.
    #[default]
    Fifo,

    /// Evict the least recently used handle.
    Lru,
}

/// Cache of opened slide handles keyed by entry-point path.
pub struct SlideHandleCache<E: DecodeEngine> {
    engine: Arc<E>,

    /// Capacity is enforced by `evict_if_full`, not by the map itself
    handles: Mutex<LruCache<PathBuf, Arc<E::Handle>>>,

    capacity: usize,
    policy: EvictionPolicy,
}

impl<E: DecodeEngine> SlideHandleCache<E> {
    /// Create a FIFO cache with the default capacity.
    pub fn new(engine: Arc<E>) -> Self {
        Self::with_capacity(engine, DEFAULT_HANDLE_CACHE_CAPACITY, EvictionPolicy::Fifo)
    }

    /// Create a cache holding at most `capacity` handles (at least one).
    pub fn with_capacity(engine: Arc<E>, capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            engine,
            handles: Mutex::new(LruCache::unbounded()),
            capacity: capacity.max(1),
            policy,
        }
    }

    /// Maximum number of resident handles.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Eviction policy in use.
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Number of resident handles.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no handle is resident.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether a handle for `path` is resident.
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    /// Return the open handle for `path`, opening it if needed.
    pub fn acquire(&self, path: &Path) -> Result<Arc<E::Handle>, EngineError> {
        if let Some(handle) = self.lookup(&mut self.lock(), path) {
            debug!(path = %path.display(), "handle cache hit");
            return Ok(handle);
        }

        if !path.exists() {
            return Err(EngineError::NotFound(path.to_path_buf()));
        }

        let opened = Arc::new(self.engine.open(path)?);
        info!(path = %path.display(), "Opened slide");

        let mut handles = self.lock();
        if let Some(resident) = self.lookup(&mut handles, path) {
            debug!(path = %path.display(), "discarding duplicate open");
            return Ok(resident);
        }
        let evicted = Self::evict_locked(&mut handles, self.capacity);
        handles.put(path.to_path_buf(), Arc::clone(&opened));
        drop(handles);

        // Closing happens after the lock is released
        drop(evicted);
        Ok(opened)
    }

    /// Evict one handle if the cache is at capacity.
    pub fn evict_if_full(&self) {
        let evicted = Self::evict_locked(&mut self.lock(), self.capacity);
        drop(evicted);
    }

    /// Drop every resident handle.
    ///
    /// Handles still used by in-flight requests close when those requests
    /// finish. Calling this more than once is harmless.
    pub fn release_all(&self) {
        let released: Vec<_> = {
            let mut handles = self.lock();
            let mut released = Vec::with_capacity(handles.len());
            while let Some((_, handle)) = handles.pop_lru() {
                released.push(handle);
            }
            released
        };
        let count = released.len();
        drop(released);
        if count > 0 {
            info!(count, "Released slide handles");
        }
    }

    fn lookup(
        &self,
        handles: &mut LruCache<PathBuf, Arc<E::Handle>>,
        path: &Path,
    ) -> Option<Arc<E::Handle>> {
        match self.policy {
            EvictionPolicy::Fifo => handles.peek(path).cloned(),
            EvictionPolicy::Lru => handles.get(path).cloned(),
        }
    }

    /// Pop handles until there is room for one more. The caller drops the
    /// returned handles once the guard is gone.
    fn evict_locked(
        handles: &mut LruCache<PathBuf, Arc<E::Handle>>,
        capacity: usize,
    ) -> Vec<Arc<E::Handle>> {
        let mut evicted = Vec::new();
        while handles.len() >= capacity {
            match handles.pop_lru() {
                Some((path, handle)) => {
                    info!(path = %path.display(), "Evicted slide handle");
                    evicted.push(handle);
                }
                None => break,
            }
        }
        evicted
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<PathBuf, Arc<E::Handle>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: DecodeEngine> Drop for SlideHandleCache<E> {
    fn drop(&mut self) {
        self.release_all();
    }
}
