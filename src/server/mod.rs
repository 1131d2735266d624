//! HTTP server layer for the thumbnail server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │     GET /api/images   GET /api/images/list   POST .../upload    │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌────────────────────────────┐   │
//! │  │        handlers          │  │          routes            │   │
//! │  │ (requests, error → JSON) │  │ (CORS, body limit, tracing)│   │
//! │  └──────────────────────────┘  └────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    full_file_handler, health_handler, list_handler, parse_dimension, resize_handler,
    root_handler, thumb_file_handler, upload_handler, ApiError, AppState, ErrorResponse,
    HealthResponse, ListedThumbnail, MessageResponse, ResizeQueryParams, UploadResponse,
    CACHE_HIT_HEADER, MAX_UPLOAD_FILES, THUMBNAIL_NAME_HEADER, UPLOAD_FIELD,
};
pub use routes::{create_router, RouterConfig, DEFAULT_CACHE_MAX_AGE, DEFAULT_MAX_UPLOAD_BYTES};
