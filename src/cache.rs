//! In-memory cache of opened videos.
//!
//! Maps source paths to parsed [`Video`] handles so a file is opened and
//! parsed once, no matter how many requests hit it. No eviction: entries
//! live until [`VideoCache::close`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::video::Video;

/// Thread-safe cache of opened videos, keyed by path.
#[derive(Debug, Default)]
pub struct VideoCache {
    entries: RwLock<HashMap<PathBuf, Arc<Video>>>,
}

impl VideoCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached video for `path`, opening and parsing it on a miss.
    ///
    /// Double-checked: the read lock serves hits concurrently; a miss takes
    /// the write lock, re-checks, then parses and inserts. Concurrent opens
    /// of the same path parse exactly once.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Arc<Video>> {
        let path = path.as_ref();

        if let Some(video) = self.entries.read().get(path) {
            return Ok(Arc::clone(video));
        }

        let mut entries = self.entries.write();
        if let Some(video) = entries.get(path) {
            return Ok(Arc::clone(video));
        }

        tracing::debug!(path = %path.display(), "cache miss, parsing source");
        let video = Arc::new(Video::open(path)?);
        entries.insert(path.to_path_buf(), Arc::clone(&video));
        Ok(video)
    }

    /// Return the cached video for `path` without opening anything.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<Video>> {
        self.entries.read().get(path.as_ref()).map(Arc::clone)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry. File handles close when the last reference to each
    /// video is released.
    pub fn close(&self) {
        let mut entries = self.entries.write();
        tracing::debug!(count = entries.len(), "closing video cache");
        entries.clear();
    }
}
