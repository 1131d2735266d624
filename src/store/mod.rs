//! Directory store layer.
//!
//! Images live in two flat directories under a common root:
//!
//! ```text
//! assets/
//! ├── full/    <name>.<ext>                          uploaded originals
//! └── thumb/   <base>_<width>w_<height>h_thumb.<ext> generated thumbnails
//! ```
//!
//! The [`DirectoryStore`] trait abstracts listing, reading and writing those
//! directories so the thumbnail service can run against the filesystem
//! ([`FsStore`]) or an in-memory store in tests.

mod directory;
mod fs_store;

pub use directory::{
    validate_name, DirectoryStore, StoreDir, StoreLayout, DEFAULT_ASSETS_DIR, DEFAULT_FULL_DIR,
    DEFAULT_THUMB_DIR,
};
pub use fs_store::FsStore;
