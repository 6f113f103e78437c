use crate::config::ThumbKitConfig;
use std::path::PathBuf;

pub const ORIGINALS_DIR: &str = "originals";
pub const RESIZED_DIR: &str = "resized";

/// Physical and public locations of an original image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPaths {
    pub name: String,
    pub path: PathBuf,
    pub url: String,
}

/// Where a `<W>x<H>_<name>` variant lives on disk and how it is addressed publicly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub url: String,
    /// Directory that must exist before `path` can be written.
    pub dir: PathBuf,
}

/// Maps logical image names onto the `originals/` and `resized/` trees.
#[derive(Debug, Clone)]
pub struct PathResolver {
    physical_root: PathBuf,
    virtual_root: String,
    use_resized_subfolder: bool,
}

impl PathResolver {
    pub fn new(config: &ThumbKitConfig) -> Self {
        Self {
            physical_root: config.physical_root.clone(),
            virtual_root: config.virtual_root.trim_end_matches('/').to_string(),
            use_resized_subfolder: config.use_resized_subfolder,
        }
    }

    /// Returns `None` when `name` already looks like a resolved reference.
    /// Pure string work; never touches the filesystem.
    pub fn resolve(&self, name: &str) -> Option<OriginalPaths> {
        if is_reference(name) {
            return None;
        }
        Some(OriginalPaths {
            name: name.to_string(),
            path: self.physical_root.join(ORIGINALS_DIR).join(name),
            url: format!("{}/{}/{}", self.virtual_root, ORIGINALS_DIR, name),
        })
    }

    pub fn cache_entry(&self, original: &OriginalPaths, width: u32, height: u32) -> CacheEntry {
        let file_name = cache_file_name(width, height, &original.name);
        let subdir = if self.use_resized_subfolder { RESIZED_DIR } else { ORIGINALS_DIR };
        let dir = self.physical_root.join(subdir);
        CacheEntry {
            path: dir.join(&file_name),
            url: format!("{}/{}/{}", self.virtual_root, subdir, file_name),
            dir,
        }
    }
}

/// A name carrying a path separator of this platform is an already-resolved path or URL.
pub fn is_reference(name: &str) -> bool {
    name.chars().any(std::path::is_separator)
}

pub fn cache_file_name(width: u32, height: u32, name: &str) -> String {
    format!("{}x{}_{}", width, height, name)
}
