//! In-memory cache for served image bytes.
//!
//! Serving a thumbnail means reading its file. This cache keeps recently
//! served files in memory, keyed by collection and stored name, and evicts
//! least-recently-used entries once the total size exceeds capacity.
//!
//! The cache only speeds up reads. Whether a thumbnail exists is always
//! decided from the directory listing, never from this cache.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;

use crate::store::StoreDir;

/// Default cache capacity: 64MB
pub const DEFAULT_CACHE_CAPACITY: usize = 64 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 10_000;

// =============================================================================
// Cache Key
// =============================================================================

/// Cache key for a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileCacheKey {
    /// Collection the file lives in
    pub dir: StoreDir,

    /// Stored file name, including extension
    pub name: Arc<str>,
}

impl FileCacheKey {
    /// Create a new cache key.
    pub fn new(dir: StoreDir, name: impl Into<Arc<str>>) -> Self {
        Self {
            dir,
            name: name.into(),
        }
    }
}

// =============================================================================
// File Cache
// =============================================================================

/// LRU cache for file bytes with size-based capacity.
///
/// # Thread Safety
///
/// The cache is thread-safe and can be shared across async tasks via `Arc`.
pub struct ThumbnailCache {
    cache: RwLock<LruCache<FileCacheKey, Bytes>>,

    /// Maximum total size in bytes
    max_size: usize,

    /// Current total size in bytes
    current_size: RwLock<usize>,
}

impl ThumbnailCache {
    /// Create a new cache with default capacity (64MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a new cache with the specified capacity in bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a new cache with specified capacity and maximum entries.
    ///
    /// A `max_entries` of zero is treated as one.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(LruCache::new(
                NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN),
            )),
            max_size,
            current_size: RwLock::new(0),
        }
    }

    /// Get a file from the cache, marking it as recently used.
    pub async fn get(&self, key: &FileCacheKey) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        cache.get(key).cloned()
    }

    /// Check if a file is cached without updating LRU order.
    pub async fn contains(&self, key: &FileCacheKey) -> bool {
        let cache = self.cache.read().await;
        cache.contains(key)
    }

    /// Store a file in the cache.
    ///
    /// Entries larger than the whole capacity are not cached. Otherwise
    /// least-recently-used entries are evicted until the cache fits.
    pub async fn put(&self, key: FileCacheKey, data: Bytes) {
        let data_size = data.len();
        if data_size > self.max_size {
            return;
        }

        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        if let Some(old_data) = cache.peek(&key) {
            *current_size = current_size.saturating_sub(old_data.len());
        }

        // The LRU may drop an entry on its own when the entry limit is hit
        if let Some((_, evicted)) = cache.push(key, data) {
            *current_size = current_size.saturating_sub(evicted.len());
        }
        *current_size += data_size;

        while *current_size > self.max_size {
            match cache.pop_lru() {
                Some((_, evicted)) => {
                    *current_size = current_size.saturating_sub(evicted.len());
                }
                None => break,
            }
        }
    }

    /// Remove a file from the cache.
    pub async fn remove(&self, key: &FileCacheKey) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        let data = cache.pop(key)?;
        *current_size = current_size.saturating_sub(data.len());
        Some(data)
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        cache.clear();
        *current_size = 0;
    }

    /// Get the current number of cached files.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Get the current total size of cached files in bytes.
    pub async fn size(&self) -> usize {
        *self.current_size.read().await
    }

    /// Get the maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new()
    }
}
