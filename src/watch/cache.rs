// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::watch::hash::compute_file_hash;

/// Last seen content hash per file, used to drop events that did not change
/// anything (editors touching files, `chmod`, a save without edits).
#[derive(Debug)]
pub struct FileCache {
    fs: Arc<dyn FileSystem>,
    hashes: HashMap<PathBuf, String>,
}

impl FileCache {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            hashes: HashMap::new(),
        }
    }

    /// Record the current content of `path`; returns whether it differs from
    /// the last recorded one.
    ///
    /// A file that is gone (or unreadable) always counts as changed and is
    /// dropped from the cache.
    pub fn refresh(&mut self, path: &Path) -> bool {
        if !self.fs.is_file(path) {
            self.hashes.remove(path);
            return true;
        }

        let hash = match compute_file_hash(self.fs.as_ref(), path) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot hash changed file");
                self.hashes.remove(path);
                return true;
            }
        };

        match self.hashes.insert(path.to_path_buf(), hash.clone()) {
            Some(previous) if previous == hash => {
                debug!(path = %path.display(), "content unchanged; ignoring event");
                false
            }
            _ => true,
        }
    }

    /// Seed the cache so the first event for `path` is compared against its
    /// current content.
    pub fn prime(&mut self, path: &Path) {
        if let Ok(hash) = compute_file_hash(self.fs.as_ref(), path) {
            self.hashes.insert(path.to_path_buf(), hash);
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
