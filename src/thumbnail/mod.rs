//! Thumbnail service layer.
//!
//! This module resolves thumbnail requests against the image store,
//! generating each thumbnail the first time it is asked for and reusing it
//! afterwards.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            Thumbnail Service            │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ Name matcher │  │  Image codec    │  │
//! │  │ (exact base  │  │  (resize,       │  │
//! │  │  names)      │  │   metadata)     │  │
//! │  └──────────────┘  └─────────────────┘  │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ Byte cache   │  │  Single-flight  │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             DirectoryStore              │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`ThumbnailService`]: Resolves requests, generates missing thumbnails, stores uploads
//! - [`ThumbnailName`]: Canonical `<base>_<w>w_<h>h_thumb.<ext>` name
//! - [`match_logical_name`]: Exact logical-name lookup in a directory listing
//! - [`Codec`] / [`ImageCodec`]: Resize and metadata over the `image` crate
//! - [`ThumbnailCache`]: LRU cache for served file bytes
//!
//! # Example
//!
//! ```
//! use thumb_server::thumbnail::{match_logical_name, ThumbnailName};
//!
//! let listing = ["mountfuji.jpg", "mount-rainier.png"];
//! let matches = match_logical_name(&listing, "mountfuji");
//! assert_eq!(matches, vec!["mountfuji.jpg"]);
//!
//! let name = ThumbnailName::for_source(&matches[0], 200, 200);
//! assert_eq!(name.to_string(), "mountfuji_200w_200h_thumb.jpg");
//! ```

mod cache;
mod codec;
mod naming;
mod service;

pub use cache::{FileCacheKey, ThumbnailCache, DEFAULT_CACHE_CAPACITY};
pub use codec::{
    clamp_quality, content_type_for_extension, content_type_for_format, is_accepted_upload,
    is_valid_quality, Codec, ImageCodec, ImageMetadata, ACCEPTED_UPLOAD_TYPES,
    DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use naming::{
    extension, is_hidden, logical_name, match_logical_name, normalize_upload_name,
    split_extension, ThumbnailName, THUMBNAIL_SUFFIX,
};
pub use service::{
    ImageRequest, ResizeResult, ThumbnailConfig, ThumbnailInfo, ThumbnailService,
    DEFAULT_MAX_DIMENSION, DEFAULT_THUMBNAIL_SIZE,
};
