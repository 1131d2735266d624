//! Router configuration for the thumbnail server.
//!
//! This module defines the HTTP routes and applies middleware for CORS, body
//! limits and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /                     - Liveness message
//! /health               - Health check
//! /api/images           - Serve a thumbnail (?filename=&width=&height=)
//! /api/images/list      - List generated thumbnails
//! /api/images/upload    - Upload full-size images (POST, multipart)
//! /full/{name}          - Stored full-size image
//! /thumb/{name}         - Stored thumbnail
//! ```
//!
//! # Example
//!
//! ```ignore
//! use thumb_server::server::{create_router, RouterConfig};
//! use thumb_server::store::{FsStore, StoreLayout};
//! use thumb_server::thumbnail::{ImageCodec, ThumbnailService};
//!
//! let service = ThumbnailService::new(FsStore::new(StoreLayout::default()), ImageCodec::new());
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    full_file_handler, health_handler, list_handler, resize_handler, root_handler,
    thumb_file_handler, upload_handler, AppState,
};
use crate::store::DirectoryStore;
use crate::thumbnail::{Codec, ThumbnailService};

/// Default Cache-Control max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Default maximum request body size for uploads (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Maximum accepted upload body size in bytes
    pub max_upload_bytes: usize,
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 1 hour (3600 seconds)
    /// - Tracing is enabled
    /// - Upload bodies are limited to 20 MiB
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            enable_tracing: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the maximum upload body size in bytes.
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `service` - The thumbnail service
/// * `config` - Router configuration
///
/// # Returns
///
/// A configured Axum router ready to be served.
pub fn create_router<S, C>(service: ThumbnailService<S, C>, config: RouterConfig) -> Router
where
    S: DirectoryStore + 'static,
    C: Codec,
{
    let app_state = AppState::with_cache_max_age(service, config.cache_max_age);
    let cors = build_cors_layer(&config);

    let api_routes = Router::new()
        .route("/", get(resize_handler::<S, C>))
        .route("/list", get(list_handler::<S, C>))
        .route(
            "/upload",
            post(upload_handler::<S, C>).layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        );

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/api/images", api_routes)
        .route("/full/{name}", get(full_file_handler::<S, C>))
        .route("/thumb/{name}", get(thumb_file_handler::<S, C>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        // No origins allowed
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
