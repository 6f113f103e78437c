use crate::paths::{CacheEntry, OriginalPaths, PathResolver};
use crate::ThumbKitError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Filesystem-backed variant cache laid out next to the originals.
///
/// Entries are keyed by `(width, height, name)` through their file name and
/// never evicted here; stale ones are overwritten in place.
#[derive(Debug, Clone)]
pub struct DiskCache {
    paths: PathResolver,
}

impl DiskCache {
    pub fn new(paths: PathResolver) -> Self {
        Self { paths }
    }

    pub fn entry_for(&self, original: &OriginalPaths, width: u32, height: u32) -> CacheEntry {
        self.paths.cache_entry(original, width, height)
    }

    /// Returns the entry if it can be served as-is for `original`.
    pub async fn get<'a>(&self, entry: &'a CacheEntry, original: &Path) -> Option<&'a CacheEntry> {
        if super::is_fresh(&entry.path, original).await {
            Some(entry)
        } else {
            None
        }
    }

    /// Stores `bytes` for `entry`. Blocking; run it off the async executor.
    pub fn put(&self, entry: &CacheEntry, bytes: &[u8]) -> Result<(), ThumbKitError> {
        persist_atomic(entry, bytes)
    }
}

/// Writes `bytes` to a temporary file beside `entry.path` and renames it into
/// place, so readers only ever see complete files.
///
/// The target directory is created on demand; a concurrent creator winning the
/// race is not an error.
pub fn persist_atomic(entry: &CacheEntry, bytes: &[u8]) -> Result<(), ThumbKitError> {
    let write_err = |source: std::io::Error| ThumbKitError::CacheWrite {
        path: entry.path.clone(),
        source,
    };

    std::fs::create_dir_all(&entry.dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(&entry.dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    // Dropping the temp file on failure removes it
    tmp.persist(&entry.path).map_err(|e| write_err(e.error))?;
    Ok(())
}
