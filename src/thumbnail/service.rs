//! Thumbnail Service for resolving and generating thumbnails.
//!
//! The ThumbnailService is the main entry point for resize requests. It
//! orchestrates:
//! - Request validation
//! - Exact-name matching against the full and thumbnail listings
//! - Cache-hit detection by canonical thumbnail name
//! - Single-flight generation for thumbnails that do not exist yet
//! - Metadata lookups and upload storage
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        ThumbnailService                           │
//! │  ┌──────────────────────────────────────────────────────────┐    │
//! │  │                       resolve()                          │    │
//! │  │  1. Validate size      4. Match thumb listing (hit?)     │    │
//! │  │  2. List full + thumb  5. Miss: single-flight generate   │    │
//! │  │  3. Match full name    6. Read back metadata             │    │
//! │  └──────────────────────────────────────────────────────────┘    │
//! │          │                      │                     │           │
//! │          ▼                      ▼                     ▼           │
//! │   ┌──────────────┐     ┌────────────────┐     ┌─────────────┐    │
//! │   │DirectoryStore│     │ThumbnailCache  │     │    Codec    │    │
//! │   └──────────────┘     └────────────────┘     └─────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The directory listing is authoritative for cache presence. The byte
//! cache only avoids re-reading files that were served recently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::{CodecError, ThumbnailError};
use crate::store::{validate_name, DirectoryStore, StoreDir};

use super::cache::{FileCacheKey, ThumbnailCache, DEFAULT_CACHE_CAPACITY};
use super::codec::{is_accepted_upload, Codec, ImageMetadata};
use super::naming::{is_hidden, match_logical_name, normalize_upload_name, ThumbnailName};

/// Default thumbnail width and height when a request omits them.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 200;

/// Default upper bound for a requested width or height.
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

// =============================================================================
// Configuration
// =============================================================================

/// Resolution settings shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailConfig {
    /// Width used when a request omits it
    pub default_width: u32,

    /// Height used when a request omits it
    pub default_height: u32,

    /// Largest accepted width or height
    pub max_dimension: u32,

    /// Upper bound for a single codec call (`None` = unbounded)
    pub codec_timeout: Option<Duration>,
}

impl ThumbnailConfig {
    /// Set the default width and height.
    pub fn with_default_size(mut self, width: u32, height: u32) -> Self {
        self.default_width = width;
        self.default_height = height;
        self
    }

    /// Set the largest accepted width or height.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Bound each codec call by `timeout`.
    pub fn with_codec_timeout(mut self, timeout: Duration) -> Self {
        self.codec_timeout = Some(timeout);
        self
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            default_width: DEFAULT_THUMBNAIL_SIZE,
            default_height: DEFAULT_THUMBNAIL_SIZE,
            max_dimension: DEFAULT_MAX_DIMENSION,
            codec_timeout: None,
        }
    }
}

// =============================================================================
// Image Request
// =============================================================================

/// A request for a thumbnail of a stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Name of the full image without its extension
    pub logical_name: String,

    /// Target width in pixels
    pub width: u32,

    /// Target height in pixels
    pub height: u32,
}

impl ImageRequest {
    /// Create a request with explicit dimensions.
    pub fn new(logical_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            logical_name: logical_name.into(),
            width,
            height,
        }
    }

    /// Create a request, filling omitted dimensions from `config`.
    ///
    /// A dimension of `0` counts as omitted.
    pub fn with_defaults(
        logical_name: impl Into<String>,
        width: Option<u32>,
        height: Option<u32>,
        config: &ThumbnailConfig,
    ) -> Self {
        Self::new(
            logical_name,
            width.filter(|&w| w > 0).unwrap_or(config.default_width),
            height.filter(|&h| h > 0).unwrap_or(config.default_height),
        )
    }

    /// Check both dimensions are within `1..=max_dimension`.
    pub fn validate(&self, max_dimension: u32) -> Result<(), ThumbnailError> {
        let in_range = |v: u32| (1..=max_dimension).contains(&v);
        if in_range(self.width) && in_range(self.height) {
            Ok(())
        } else {
            Err(ThumbnailError::InvalidDimensions {
                width: self.width,
                height: self.height,
                max: max_dimension,
            })
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeResult {
    /// Metadata of the thumbnail file
    pub metadata: ImageMetadata,

    /// Stored name of the thumbnail, including extension
    pub thumbnail_name: String,

    /// Whether the thumbnail already existed before this request
    pub cache_hit: bool,
}

/// A stored thumbnail and its metadata, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailInfo {
    /// Stored file name
    pub name: String,

    /// Image metadata
    #[serde(flatten)]
    pub metadata: ImageMetadata,
}

// =============================================================================
// Single-flight State
// =============================================================================

type GenerateResult = Result<ResizeResult, ThumbnailError>;

/// State for an in-flight thumbnail generation.
struct InFlightState {
    /// Notification for waiters
    notify: Notify,

    /// Result of the generation (set by the leader before it leaves)
    result: Mutex<Option<GenerateResult>>,
}

type InFlightMap = Mutex<HashMap<String, Arc<InFlightState>>>;

/// Removes the leader's entry and wakes waiters, even if the leader is
/// cancelled mid-generation.
struct InFlightGuard<'a> {
    map: &'a InFlightMap,
    key: String,
    state: Arc<InFlightState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.map).remove(&self.key);
        self.state.notify.notify_waiters();
    }
}

enum Role {
    Leader(Arc<InFlightState>),
    Follower(Arc<InFlightState>),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Thumbnail Service
// =============================================================================

/// Service for resolving, generating and describing thumbnails.
///
/// # Type Parameters
///
/// * `S` - The directory store holding full images and thumbnails
/// * `C` - The image codec
///
/// # Example
///
/// ```ignore
/// use thumb_server::store::{FsStore, StoreLayout};
/// use thumb_server::thumbnail::{ImageCodec, ImageRequest, ThumbnailService};
///
/// let store = FsStore::new(StoreLayout::default());
/// let service = ThumbnailService::new(store, ImageCodec::new());
///
/// let request = ImageRequest::new("mountfuji", 200, 200);
/// if let Some(result) = service.resolve(&request).await? {
///     println!("{} (cache hit: {})", result.thumbnail_name, result.cache_hit);
/// }
/// ```
pub struct ThumbnailService<S: DirectoryStore, C: Codec> {
    store: Arc<S>,
    codec: Arc<C>,
    config: ThumbnailConfig,

    /// Recently served file bytes
    cache: ThumbnailCache,

    /// Generations in progress, keyed by canonical thumbnail name
    in_flight: InFlightMap,
}

impl<S: DirectoryStore, C: Codec> ThumbnailService<S, C> {
    /// Create a service with default configuration and cache capacity.
    pub fn new(store: S, codec: C) -> Self {
        Self::with_config(
            Arc::new(store),
            Arc::new(codec),
            ThumbnailConfig::default(),
            DEFAULT_CACHE_CAPACITY,
        )
    }

    /// Create a service with explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `store` - Shared directory store
    /// * `codec` - Shared image codec
    /// * `config` - Resolution settings
    /// * `cache_bytes` - Byte cache capacity for served files
    pub fn with_config(
        store: Arc<S>,
        codec: Arc<C>,
        config: ThumbnailConfig,
        cache_bytes: usize,
    ) -> Self {
        Self {
            store,
            codec,
            config,
            cache: ThumbnailCache::with_capacity(cache_bytes),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a request to a thumbnail, generating it if needed.
    ///
    /// Returns `Ok(None)` when no full image has the requested logical
    /// name. An existing thumbnail is returned as-is, even if the full image
    /// changed after it was generated.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The requested size is zero or above the configured maximum
    /// - A directory cannot be listed, read or written
    /// - The codec cannot process the source or thumbnail
    /// - A codec call exceeds the configured timeout
    pub async fn resolve(
        &self,
        request: &ImageRequest,
    ) -> Result<Option<ResizeResult>, ThumbnailError> {
        request.validate(self.config.max_dimension)?;

        let (full_listing, thumb_listing) = tokio::try_join!(
            self.store.list_entries(StoreDir::Full),
            self.store.list_entries(StoreDir::Thumb),
        )?;

        // Dot-files are never sources; their thumbnails could not be listed or served
        let sources: Vec<&str> = full_listing
            .iter()
            .map(String::as_str)
            .filter(|name| !is_hidden(name))
            .collect();

        // Listings are sorted, so the first match is the lexicographic winner
        let Some(source_name) = match_logical_name(&sources, &request.logical_name)
            .into_iter()
            .next()
        else {
            debug!(name = %request.logical_name, "No full image with this name");
            return Ok(None);
        };

        let thumb_name = ThumbnailName::for_source(&source_name, request.width, request.height);

        if let Some(existing) = match_logical_name(&thumb_listing, &thumb_name.logical())
            .into_iter()
            .next()
        {
            debug!(thumbnail = %existing, "Thumbnail cache hit");
            let metadata = self.metadata_of(StoreDir::Thumb, &existing).await?;
            return Ok(Some(ResizeResult {
                metadata,
                thumbnail_name: existing,
                cache_hit: true,
            }));
        }

        debug!(thumbnail = %thumb_name, "Thumbnail cache miss");
        self.generate_once(&source_name, &thumb_name).await.map(Some)
    }

    /// Run [`Self::generate`] at most once per canonical name at a time.
    ///
    /// Concurrent callers for the same name wait for the leader and share its
    /// result. If the leader is cancelled before finishing, a waiter takes
    /// over.
    async fn generate_once(&self, source_name: &str, thumb_name: &ThumbnailName) -> GenerateResult {
        let key = thumb_name.to_string();

        loop {
            let role = {
                let mut in_flight = lock(&self.in_flight);
                match in_flight.get(&key) {
                    Some(state) => Role::Follower(Arc::clone(state)),
                    None => {
                        let state = Arc::new(InFlightState {
                            notify: Notify::new(),
                            result: Mutex::new(None),
                        });
                        in_flight.insert(key.clone(), Arc::clone(&state));
                        Role::Leader(state)
                    }
                }
            };

            match role {
                Role::Leader(state) => {
                    let _guard = InFlightGuard {
                        map: &self.in_flight,
                        key: key.clone(),
                        state: Arc::clone(&state),
                    };

                    let result = self.generate(source_name, thumb_name).await;
                    *lock(&state.result) = Some(result.clone());
                    return result;
                }
                Role::Follower(state) => {
                    let notified = state.notify.notified();
                    tokio::pin!(notified);
                    notified.as_mut().enable();

                    let ready = lock(&state.result).clone();
                    if let Some(result) = ready {
                        return result;
                    }

                    // Leader already left without a result
                    if !self.is_in_flight(&key, &state) {
                        continue;
                    }

                    notified.await;

                    let ready = lock(&state.result).clone();
                    if let Some(result) = ready {
                        return result;
                    }
                }
            }
        }
    }

    fn is_in_flight(&self, key: &str, state: &Arc<InFlightState>) -> bool {
        lock(&self.in_flight)
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, state))
    }

    /// Resize the source, write the thumbnail and read back its metadata.
    async fn generate(&self, source_name: &str, thumb_name: &ThumbnailName) -> GenerateResult {
        let stored_name = thumb_name.to_string();

        // A previous leader may have written it after our listing was taken
        if self.store.exists(StoreDir::Thumb, &stored_name).await? {
            debug!(thumbnail = %stored_name, "Thumbnail written by an earlier request");
            let metadata = self.metadata_of(StoreDir::Thumb, &stored_name).await?;
            return Ok(ResizeResult {
                metadata,
                thumbnail_name: stored_name,
                cache_hit: true,
            });
        }

        let started = Instant::now();
        let source = self.store.read_file(StoreDir::Full, source_name).await?;

        let codec = Arc::clone(&self.codec);
        let (width, height) = (thumb_name.width(), thumb_name.height());
        let output = self
            .run_codec(source_name, move || codec.resize(&source, width, height))
            .await?;

        self.store
            .write_file(StoreDir::Thumb, &stored_name, output.clone())
            .await?;
        self.cache
            .put(FileCacheKey::new(StoreDir::Thumb, stored_name.as_str()), output)
            .await;

        let metadata = self.metadata_of(StoreDir::Thumb, &stored_name).await?;

        info!(
            source = source_name,
            thumbnail = %stored_name,
            width,
            height,
            size = metadata.size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generated thumbnail"
        );

        Ok(ResizeResult {
            metadata,
            thumbnail_name: stored_name,
            cache_hit: false,
        })
    }

    /// Read the metadata of a stored file.
    pub async fn metadata_of(
        &self,
        dir: StoreDir,
        name: &str,
    ) -> Result<ImageMetadata, ThumbnailError> {
        let data = self.read(dir, name).await?;
        let codec = Arc::clone(&self.codec);
        self.run_codec(name, move || codec.metadata(&data)).await
    }

    /// List every thumbnail with its metadata, sorted by name.
    ///
    /// Dot-files are skipped. Files the codec cannot read are logged and
    /// left out rather than failing the whole listing.
    pub async fn list_thumbnails(&self) -> Result<Vec<ThumbnailInfo>, ThumbnailError> {
        let listing = self.store.list_entries(StoreDir::Thumb).await?;

        let mut thumbnails = Vec::with_capacity(listing.len());
        for name in listing.into_iter().filter(|name| !is_hidden(name)) {
            match self.metadata_of(StoreDir::Thumb, &name).await {
                Ok(metadata) => thumbnails.push(ThumbnailInfo { name, metadata }),
                Err(ThumbnailError::Decode { source, .. }) => {
                    warn!(thumbnail = %name, error = %source, "Skipping unreadable thumbnail");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(thumbnails)
    }

    /// Read a stored file, serving from the byte cache when possible.
    pub async fn read(&self, dir: StoreDir, name: &str) -> Result<Bytes, ThumbnailError> {
        let key = FileCacheKey::new(dir, name);
        if let Some(data) = self.cache.get(&key).await {
            return Ok(data);
        }

        let data = self.store.read_file(dir, name).await?;
        self.cache.put(key, data.clone()).await;
        Ok(data)
    }

    /// Check an upload without storing it and return its stored name.
    pub fn check_upload(
        &self,
        original_name: &str,
        content_type: Option<&str>,
    ) -> Result<String, ThumbnailError> {
        if !is_accepted_upload(content_type) {
            return Err(ThumbnailError::UnsupportedUpload {
                file_name: original_name.to_string(),
            });
        }

        let stored_name = normalize_upload_name(original_name);
        validate_name(&stored_name)?;
        Ok(stored_name)
    }

    /// Store an uploaded full image and return its stored name.
    ///
    /// Existing thumbnails of a replaced image are kept.
    pub async fn store_upload(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<String, ThumbnailError> {
        let stored_name = self.check_upload(original_name, content_type)?;
        let replaced = self.store.exists(StoreDir::Full, &stored_name).await?;
        let size = data.len();

        self.store
            .write_file(StoreDir::Full, &stored_name, data)
            .await?;
        self.cache
            .remove(&FileCacheKey::new(StoreDir::Full, stored_name.as_str()))
            .await;

        info!(
            original = original_name,
            stored = %stored_name,
            size,
            replaced,
            "Stored upload"
        );
        Ok(stored_name)
    }

    /// Get cache statistics as `(current_size, capacity, entry_count)`.
    pub async fn cache_stats(&self) -> (usize, usize, usize) {
        let size = self.cache.size().await;
        let capacity = self.cache.capacity();
        let count = self.cache.len().await;
        (size, capacity, count)
    }

    /// Resolution settings.
    pub fn config(&self) -> &ThumbnailConfig {
        &self.config
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run a codec call on the blocking pool, bounded by the configured
    /// timeout.
    async fn run_codec<T, F>(&self, name: &str, work: F) -> Result<T, ThumbnailError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, CodecError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(work);

        let joined = match self.config.codec_timeout {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                ThumbnailError::Timeout {
                    name: name.to_string(),
                    limit,
                }
            })?,
            None => task.await,
        };

        joined
            .map_err(|e| ThumbnailError::Task(e.to_string()))?
            .map_err(|source| ThumbnailError::Decode {
                name: name.to_string(),
                source,
            })
    }
}

// =============================================================================
// Tests
// =============================================================================
