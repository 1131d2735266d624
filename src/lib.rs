//! Thumb Server - resize-on-demand image thumbnails.
//!
//! Clients upload full-size images, request thumbnails by name and size, and
//! list the thumbnails generated so far. Each thumbnail is produced the first
//! time a size is requested and stored under a canonical name, so later
//! requests for the same size are plain reads.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          HTTP Layer (axum)                           │
//! │   /api/images   /api/images/list   /api/images/upload   /full /thumb │
//! └──────────────────────────────────┬──────────────────────────────────┘
//!                                    │
//! ┌──────────────────────────────────▼──────────────────────────────────┐
//! │                         Thumbnail Service                            │
//! │   exact-name matching · canonical names · single-flight generation   │
//! └───────────────┬──────────────────────────────────┬──────────────────┘
//!                 │                                  │
//! ┌───────────────▼─────────────────┐  ┌─────────────▼──────────────────┐
//! │         Directory Store          │  │          Image Codec           │
//! │   assets/full   assets/thumb     │  │   resize (cover) · metadata    │
//! └─────────────────────────────────┘  └────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`error`]: Error types for the store, codec and service
//! - [`server`]: HTTP handlers and router
//! - [`store`]: Directory store trait and filesystem implementation
//! - [`thumbnail`]: Name matching, codec, byte cache and the thumbnail service

pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod thumbnail;

pub use config::{CheckConfig, Cli, Command, ServeConfig};
pub use error::{CodecError, StoreError, ThumbnailError};
pub use server::{create_router, RouterConfig};
pub use store::{DirectoryStore, FsStore, StoreDir, StoreLayout};
pub use thumbnail::{
    Codec, ImageCodec, ImageMetadata, ImageRequest, ResizeResult, ThumbnailConfig,
    ThumbnailService,
};
