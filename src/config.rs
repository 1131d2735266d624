//! Configuration management for the thumbnail server.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `THUMB_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `thumb-server serve` (or no subcommand) - Run the HTTP server
//! - `thumb-server check` - Verify the image directories and exit
//!
//! # Environment Variables
//!
//! - `THUMB_HOST` - Server bind address (default: 0.0.0.0)
//! - `THUMB_PORT` - Server port (default: 5000)
//! - `THUMB_ASSETS_DIR` - Root image directory (default: assets)
//! - `THUMB_FULL_DIR` - Full-size image directory under the root (default: full)
//! - `THUMB_THUMB_DIR` - Thumbnail directory under the root (default: thumb)
//! - `THUMB_DEFAULT_SIZE` - Width/height when a request omits them (default: 200)
//! - `THUMB_MAX_DIMENSION` - Largest accepted width/height (default: 4096)
//! - `THUMB_JPEG_QUALITY` - JPEG quality for thumbnails (default: 80)
//! - `THUMB_CACHE_BYTES` - In-memory byte cache size (default: 64 MiB)
//! - `THUMB_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `THUMB_CODEC_TIMEOUT_SECS` - Per codec call timeout (default: none)
//! - `THUMB_MAX_UPLOAD_BYTES` - Upload body limit (default: 20 MiB)
//! - `THUMB_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::server::{RouterConfig, DEFAULT_CACHE_MAX_AGE, DEFAULT_MAX_UPLOAD_BYTES};
use crate::store::{StoreLayout, DEFAULT_ASSETS_DIR, DEFAULT_FULL_DIR, DEFAULT_THUMB_DIR};
use crate::thumbnail::{
    is_valid_quality, ThumbnailConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_DIMENSION, DEFAULT_THUMBNAIL_SIZE,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Thumb Server - resize-on-demand image thumbnails.
///
/// Serves thumbnails of uploaded images, generating each size the first time
/// it is requested and reusing it afterwards.
#[derive(Parser, Debug, Clone)]
#[command(name = "thumb-server")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server options used when no subcommand is given
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve(ServeConfig),

    /// Check the image directories and exit
    Check(CheckConfig),
}

/// Location of the image directories.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct StoreArgs {
    /// Root directory holding the full-size and thumbnail directories.
    #[arg(long, default_value = DEFAULT_ASSETS_DIR, env = "THUMB_ASSETS_DIR")]
    pub assets_dir: PathBuf,

    /// Directory name for full-size images, relative to the root.
    #[arg(long, default_value = DEFAULT_FULL_DIR, env = "THUMB_FULL_DIR")]
    pub full_dir: String,

    /// Directory name for thumbnails, relative to the root.
    #[arg(long, default_value = DEFAULT_THUMB_DIR, env = "THUMB_THUMB_DIR")]
    pub thumb_dir: String,
}

impl StoreArgs {
    /// Build the store layout.
    pub fn layout(&self) -> StoreLayout {
        StoreLayout::new(&self.assets_dir).with_dirs(&self.full_dir, &self.thumb_dir)
    }

    fn validate(&self) -> Result<(), String> {
        for (flag, dir) in [("full_dir", &self.full_dir), ("thumb_dir", &self.thumb_dir)] {
            if dir.trim().is_empty() {
                return Err(format!("{} must not be empty", flag));
            }
        }
        if self.full_dir == self.thumb_dir {
            return Err("full_dir and thumb_dir must be different directories".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Serve Configuration
// =============================================================================

/// Options for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "THUMB_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "THUMB_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    #[command(flatten)]
    pub store: StoreArgs,

    // =========================================================================
    // Thumbnail Configuration
    // =========================================================================
    /// Width and height used when a request omits them.
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_SIZE, env = "THUMB_DEFAULT_SIZE")]
    pub default_size: u32,

    /// Largest accepted width or height.
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, env = "THUMB_MAX_DIMENSION")]
    pub max_dimension: u32,

    /// JPEG quality for generated thumbnails (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "THUMB_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Abort a single decode/resize/encode after this many seconds.
    ///
    /// If not specified, codec calls are not bounded.
    #[arg(long, env = "THUMB_CODEC_TIMEOUT_SECS")]
    pub codec_timeout_secs: Option<u64>,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Size in bytes of the in-memory cache for served files.
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY, env = "THUMB_CACHE_BYTES")]
    pub cache_bytes: usize,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "THUMB_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// Maximum upload request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "THUMB_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "THUMB_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()?;

        if self.max_dimension == 0 {
            return Err("max_dimension must be greater than 0".to_string());
        }
        if self.default_size == 0 || self.default_size > self.max_dimension {
            return Err(format!(
                "default_size must be between 1 and max_dimension ({})",
                self.max_dimension
            ));
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.codec_timeout_secs == Some(0) {
            return Err("codec_timeout_secs must be greater than 0".to_string());
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the thumbnail resolution settings.
    pub fn thumbnail_config(&self) -> ThumbnailConfig {
        let config = ThumbnailConfig::default()
            .with_default_size(self.default_size, self.default_size)
            .with_max_dimension(self.max_dimension);

        match self.codec_timeout_secs {
            Some(secs) => config.with_codec_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }

    /// Build the router configuration.
    pub fn router_config(&self) -> RouterConfig {
        let mut router_config = RouterConfig::new()
            .with_cache_max_age(self.cache_max_age)
            .with_max_upload_bytes(self.max_upload_bytes)
            .with_tracing(!self.no_tracing);

        if let Some(ref origins) = self.cors_origins {
            router_config = router_config.with_cors_origins(origins.clone());
        }

        router_config
    }
}

// =============================================================================
// Check Configuration
// =============================================================================

/// Options for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Also list the stored images.
    #[arg(long, default_value_t = false)]
    pub list_images: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CheckConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
