// Re-export modules
pub mod disk;
pub mod flight;

pub use disk::{persist_atomic, DiskCache};
pub use flight::{Flight, SingleFlight};

use std::path::Path;
use std::time::SystemTime;
use tokio::fs;

/// Whether a cached variant may be served for `original`.
///
/// A missing cache file is never fresh. Otherwise the variant is fresh when its
/// modification time is at least the original's; equal timestamps count as
/// fresh. Any metadata error is treated as stale.
pub async fn is_fresh(cache_path: &Path, original_path: &Path) -> bool {
    let Some(cached) = mtime(cache_path).await else {
        return false;
    };
    let Some(original) = mtime(original_path).await else {
        return false;
    };
    cached >= original
}

async fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).await.and_then(|m| m.modified()).ok()
}

/// True when `path` exists and is a regular file (symlinks are followed).
pub async fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}
