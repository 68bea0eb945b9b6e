//! Stable slide identifiers.
//!
//! Raw filesystem paths never leave the server. Every supported slide is
//! addressed by a fingerprint of its entry-point path instead, and the index
//! resolves fingerprints back to paths.
//!
//! The map is built by a full recursive scan on first use and is never
//! invalidated automatically: a slide added afterwards does not resolve until
//! [`SlideIndex::rebuild`] is called or the process restarts. Moving or
//! renaming a slide changes its identifier.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use sha2::{Digest, Sha256};
use tracing::info;

use crate::format::FormatValidator;

use super::engine::DecodeEngine;

/// Number of hex characters kept from the digest.
pub const SLIDE_ID_LEN: usize = 12;

/// Fingerprint of a slide's entry-point path.
///
/// The first [`SLIDE_ID_LEN`] lowercase hex characters of the SHA-256 digest
/// of the path string.
pub fn slide_id(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(SLIDE_ID_LEN);
    id
}

type IdMap = HashMap<String, PathBuf>;

/// Lazily built identifier → entry-point map.
pub struct SlideIndex<E: DecodeEngine> {
    root: PathBuf,
    validator: FormatValidator<E>,
    entries: RwLock<Option<Arc<IdMap>>>,
}

impl<E: DecodeEngine> SlideIndex<E> {
    /// Create an empty index over `root`. Nothing is scanned until first use.
    pub fn new(root: impl Into<PathBuf>, validator: FormatValidator<E>) -> Self {
        Self {
            root: root.into(),
            validator,
            entries: RwLock::new(None),
        }
    }

    /// The scanned root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an identifier to its entry point.
    pub fn resolve(&self, id: &str) -> Option<PathBuf> {
        self.map().get(id).cloned()
    }

    /// Every indexed `(id, path)` pair, sorted by path.
    pub fn entries(&self) -> Vec<(String, PathBuf)> {
        let mut entries: Vec<_> = self
            .map()
            .iter()
            .map(|(id, path)| (id.clone(), path.clone()))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        entries
    }

    /// Rescan the root and replace the map.
    pub fn rebuild(&self) {
        let map = Arc::new(self.build());
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = Some(map);
    }

    /// Whether the first scan has completed.
    pub fn is_built(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn map(&self) -> Arc<IdMap> {
        if let Some(map) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Arc::clone(map);
        }

        // Scan without holding the lock; the first writer wins.
        let built = Arc::new(self.build());
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(guard.get_or_insert(built))
    }

    fn build(&self) -> IdMap {
        let report = self.validator.scan(&self.scan_root(), true);
        let map: IdMap = report
            .slides
            .into_iter()
            .filter(|slide| slide.is_supported)
            .map(|slide| (slide_id(&slide.entry_point), slide.entry_point))
            .collect();
        info!(root = %self.root.display(), slides = map.len(), "Built slide index");
        map
    }

    /// The canonical root, so ids match the paths the browser reports.
    fn scan_root(&self) -> PathBuf {
        std::fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone())
    }
}
