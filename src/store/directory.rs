//! Store directories, their on-disk layout, and the [`DirectoryStore`] trait.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

/// Default root directory holding both image collections.
pub const DEFAULT_ASSETS_DIR: &str = "assets";

/// Default directory name for uploaded full-size images.
pub const DEFAULT_FULL_DIR: &str = "full";

/// Default directory name for generated thumbnails.
pub const DEFAULT_THUMB_DIR: &str = "thumb";

// =============================================================================
// Store Directories
// =============================================================================

/// One of the two image collections managed by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreDir {
    /// Full-resolution uploads
    Full,

    /// Generated thumbnails
    Thumb,
}

impl StoreDir {
    /// Short name used in logs and URLs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StoreDir::Full => "full",
            StoreDir::Thumb => "thumb",
        }
    }
}

impl fmt::Display for StoreDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk layout of the two image collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Root directory containing both collections
    pub root: PathBuf,

    /// Directory name (relative to root) for full-size images
    pub full_dir: String,

    /// Directory name (relative to root) for thumbnails
    pub thumb_dir: String,
}

impl StoreLayout {
    /// Create a layout rooted at `root` with the default directory names.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            full_dir: DEFAULT_FULL_DIR.to_string(),
            thumb_dir: DEFAULT_THUMB_DIR.to_string(),
        }
    }

    /// Override the directory names.
    pub fn with_dirs(mut self, full_dir: impl Into<String>, thumb_dir: impl Into<String>) -> Self {
        self.full_dir = full_dir.into();
        self.thumb_dir = thumb_dir.into();
        self
    }

    /// Absolute or root-relative path of a collection directory.
    pub fn dir_path(&self, dir: StoreDir) -> PathBuf {
        match dir {
            StoreDir::Full => self.root.join(&self.full_dir),
            StoreDir::Thumb => self.root.join(&self.thumb_dir),
        }
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self::new(DEFAULT_ASSETS_DIR)
    }
}

// =============================================================================
// DirectoryStore Trait
// =============================================================================

/// Read/write access to the full and thumbnail collections.
///
/// Implementations must be thread-safe; the thumbnail service shares one
/// store across all request handlers.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// List the file names in a collection.
    ///
    /// Names include their extension. The listing is sorted lexicographically
    /// so that callers picking the first match get a stable result.
    async fn list_entries(&self, dir: StoreDir) -> Result<Vec<String>, StoreError>;

    /// Read the full contents of a file.
    async fn read_file(&self, dir: StoreDir, name: &str) -> Result<Bytes, StoreError>;

    /// Write a file, replacing any existing file with the same name.
    ///
    /// Readers never observe a partially written file.
    async fn write_file(&self, dir: StoreDir, name: &str, data: Bytes) -> Result<(), StoreError>;

    /// Check whether a regular file with this name exists in a collection.
    async fn exists(&self, dir: StoreDir, name: &str) -> Result<bool, StoreError>;

    /// Human-readable identifier for logging (e.g. the root path).
    fn identifier(&self) -> &str;
}

/// Reject names that are empty or could address something outside a
/// collection directory.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if invalid {
        Err(StoreError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}
