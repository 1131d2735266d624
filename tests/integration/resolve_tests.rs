//! Service-level tests for thumbnail resolution.
//!
//! These run the thumbnail service directly against the in-memory store and
//! the filesystem store, including concurrent requests for the same size.

use std::sync::Arc;
use std::time::Duration;

use thumb_server::store::StoreDir;
use thumb_server::thumbnail::{ImageRequest, ThumbnailConfig, ThumbnailService};
use thumb_server::ThumbnailError;

use super::test_utils::{
    create_test_jpeg, create_test_png, fuji_assets, image_dimensions, CountingCodec, MockStore,
};

const CACHE_BYTES: usize = 4 * 1024 * 1024;

fn mock_service(
    store: MockStore,
    codec: CountingCodec,
) -> (Arc<ThumbnailService<MockStore, CountingCodec>>, Arc<MockStore>) {
    let store = Arc::new(store);
    let service = ThumbnailService::with_config(
        Arc::clone(&store),
        Arc::new(codec),
        ThumbnailConfig::default(),
        CACHE_BYTES,
    );
    (Arc::new(service), store)
}

#[tokio::test]
async fn test_resolve_with_mock_store() {
    let store = MockStore::new().with_file(StoreDir::Full, "pollock.jpg", create_test_jpeg(80, 40));
    let codec = CountingCodec::new();
    let (service, store) = mock_service(store, codec.clone());

    let result = service
        .resolve(&ImageRequest::new("pollock", 40, 40))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.thumbnail_name, "pollock_40w_40h_thumb.jpg");
    assert!(!result.cache_hit);
    assert_eq!(result.metadata.width, 40);
    assert_eq!(result.metadata.height, 40);
    assert_eq!(result.metadata.format, "jpeg");

    assert_eq!(
        store.names(StoreDir::Thumb).await,
        vec!["pollock_40w_40h_thumb.jpg".to_string()]
    );
    assert_eq!(store.write_count(), 1);
    assert_eq!(codec.resize_count(), 1);
}

#[tokio::test]
async fn test_resolve_missing_image_is_none() {
    let store = MockStore::new().with_file(StoreDir::Full, "pollock.jpg", create_test_jpeg(8, 8));
    let (service, store) = mock_service(store, CountingCodec::new());

    let result = service
        .resolve(&ImageRequest::new("argentina", 200, 200))
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(store.names(StoreDir::Thumb).await.is_empty());
}

#[tokio::test]
async fn test_resolve_thumbnail_extension_follows_source() {
    let store = MockStore::new()
        .with_file(StoreDir::Full, "kandinsky.png", create_test_png(50, 50))
        .with_file(StoreDir::Full, "pollock.jpeg", create_test_jpeg(50, 50));
    let (service, _store) = mock_service(store, CountingCodec::new());

    let png = service
        .resolve(&ImageRequest::new("kandinsky", 10, 20))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(png.thumbnail_name, "kandinsky_10w_20h_thumb.png");
    assert_eq!(png.metadata.format, "png");

    let jpeg = service
        .resolve(&ImageRequest::new("pollock", 10, 20))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(jpeg.thumbnail_name, "pollock_10w_20h_thumb.jpeg");
}

#[tokio::test]
async fn test_resolve_rejects_zero_dimensions() {
    let store = MockStore::new().with_file(StoreDir::Full, "pollock.jpg", create_test_jpeg(8, 8));
    let (service, _store) = mock_service(store, CountingCodec::new());

    let err = service
        .resolve(&ImageRequest::new("pollock", 0, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, ThumbnailError::InvalidDimensions { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_resize_once() {
    let store = MockStore::new().with_file(StoreDir::Full, "pollock.jpg", create_test_jpeg(120, 90));
    let codec = CountingCodec::with_delay(Duration::from_millis(100));
    let (service, store) = mock_service(store, codec.clone());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .resolve(&ImageRequest::new("pollock", 60, 60))
                .await
                .unwrap()
                .unwrap()
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.thumbnail_name, "pollock_60w_60h_thumb.jpg");
        assert_eq!(result.metadata.width, 60);
    }

    assert_eq!(codec.resize_count(), 1);
    assert_eq!(store.write_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_different_sizes() {
    let store = MockStore::new().with_file(StoreDir::Full, "pollock.jpg", create_test_jpeg(120, 90));
    let codec = CountingCodec::with_delay(Duration::from_millis(20));
    let (service, store) = mock_service(store, codec.clone());

    let mut handles = Vec::new();
    for size in [30, 40, 50] {
        for _ in 0..3 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .resolve(&ImageRequest::new("pollock", size, size))
                    .await
                    .unwrap()
                    .unwrap()
            }));
        }
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(codec.resize_count(), 3);
    assert_eq!(
        store.names(StoreDir::Thumb).await,
        vec![
            "pollock_30w_30h_thumb.jpg".to_string(),
            "pollock_40w_40h_thumb.jpg".to_string(),
            "pollock_50w_50h_thumb.jpg".to_string(),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_on_filesystem() {
    let assets = fuji_assets();
    let codec = CountingCodec::with_delay(Duration::from_millis(50));
    let service = Arc::new(ThumbnailService::with_config(
        Arc::new(assets.store()),
        Arc::new(codec.clone()),
        ThumbnailConfig::default(),
        CACHE_BYTES,
    ));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .resolve(&ImageRequest::new("mountfuji", 100, 75))
                .await
                .unwrap()
                .unwrap()
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(codec.resize_count(), 1);

    // Only the final file remains; no temporary files are left behind
    assert_eq!(
        assets.file_names(StoreDir::Thumb),
        vec!["mountfuji_100w_75h_thumb.jpg".to_string()]
    );
    let data = assets.read_file(StoreDir::Thumb, "mountfuji_100w_75h_thumb.jpg");
    assert_eq!(image_dimensions(&data), (100, 75));
}

#[tokio::test]
async fn test_codec_timeout_maps_to_timeout_error() {
    let store = MockStore::new().with_file(StoreDir::Full, "pollock.jpg", create_test_jpeg(16, 16));
    let service = ThumbnailService::with_config(
        Arc::new(store),
        Arc::new(CountingCodec::with_delay(Duration::from_millis(500))),
        ThumbnailConfig::default().with_codec_timeout(Duration::from_millis(20)),
        CACHE_BYTES,
    );

    let err = service
        .resolve(&ImageRequest::new("pollock", 8, 8))
        .await
        .unwrap_err();
    assert!(matches!(err, ThumbnailError::Timeout { .. }));
}
