//! API integration tests for thumbnail retrieval and error handling.
//!
//! Tests verify:
//! - Thumbnail generation and reuse through `GET /api/images`
//! - Error cases (missing filename, bad numbers, unknown or corrupt images)
//! - Static serving of stored files
//! - HTTP response codes and headers

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use thumb_server::store::StoreDir;
use thumb_server::thumbnail::ThumbnailConfig;
use thumb_server::RouterConfig;

use super::test_utils::{
    body_bytes, body_json, create_test_gif, create_test_jpeg, create_test_png, fuji_assets, get,
    image_dimensions, is_valid_jpeg, is_valid_png, multipart_request, test_router,
    test_router_with, CountingCodec, Part, TestAssets,
};

// =============================================================================
// Service Status
// =============================================================================

#[tokio::test]
async fn test_root_endpoint() {
    let assets = TestAssets::new();
    let router = test_router(&assets, CountingCodec::new());

    let response = router.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Server is Up!");
}

#[tokio::test]
async fn test_health_endpoint() {
    let assets = TestAssets::new();
    let router = test_router(&assets, CountingCodec::new());

    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

// =============================================================================
// Thumbnail Retrieval
// =============================================================================

#[tokio::test]
async fn test_resize_generates_thumbnail() {
    let assets = fuji_assets();
    let codec = CountingCodec::new();
    let router = test_router(&assets, codec.clone());

    let response = router
        .oneshot(get("/api/images?filename=mountfuji&width=300&height=150"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/jpeg");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(
        response.headers().get("x-thumbnail-cache-hit").unwrap(),
        "false"
    );
    assert_eq!(
        response.headers().get("x-thumbnail-name").unwrap(),
        "mountfuji_300w_150h_thumb.jpg"
    );

    let body = body_bytes(response).await;
    assert!(is_valid_jpeg(&body));
    assert_eq!(image_dimensions(&body), (300, 150));

    // The thumbnail is persisted under its canonical name
    assert!(assets.has_file(StoreDir::Thumb, "mountfuji_300w_150h_thumb.jpg"));
    assert_eq!(codec.resize_count(), 1);
}

#[tokio::test]
async fn test_resize_second_request_is_cache_hit() {
    let assets = fuji_assets();
    let codec = CountingCodec::new();
    let router = test_router(&assets, codec.clone());
    let uri = "/api/images?filename=mountfuji&width=120&height=120";

    let first = router.clone().oneshot(get(uri)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers().get("x-thumbnail-cache-hit").unwrap(), "false");
    let first_body = body_bytes(first).await;

    let second = router.oneshot(get(uri)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers().get("x-thumbnail-cache-hit").unwrap(), "true");
    let second_body = body_bytes(second).await;

    assert_eq!(first_body, second_body);
    assert_eq!(codec.resize_count(), 1);
    assert_eq!(
        assets.file_names(StoreDir::Thumb),
        vec!["mountfuji_120w_120h_thumb.jpg".to_string()]
    );
}

#[tokio::test]
async fn test_resize_uses_default_size() {
    let assets = fuji_assets();
    let router = test_router(&assets, CountingCodec::new());

    let response = router
        .oneshot(get("/api/images?filename=mountfuji"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-thumbnail-name").unwrap(),
        "mountfuji_200w_200h_thumb.jpg"
    );
    let body = body_bytes(response).await;
    assert_eq!(image_dimensions(&body), (200, 200));
}

#[tokio::test]
async fn test_resize_zero_means_default() {
    let assets = fuji_assets();
    let router = test_router_with(
        &assets,
        CountingCodec::new(),
        ThumbnailConfig::default().with_default_size(64, 48),
        RouterConfig::new(),
    );

    let response = router
        .oneshot(get("/api/images?filename=mountfuji&width=0&height=30"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-thumbnail-name").unwrap(),
        "mountfuji_64w_30h_thumb.jpg"
    );
}

#[tokio::test]
async fn test_resize_png_keeps_format() {
    let assets =
        TestAssets::new().with_file(StoreDir::Full, "kandinsky.png", &create_test_png(90, 60));
    let router = test_router(&assets, CountingCodec::new());

    let response = router
        .oneshot(get("/api/images?filename=kandinsky&width=30&height=30"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");

    let body = body_bytes(response).await;
    assert!(is_valid_png(&body));
    assert!(assets.has_file(StoreDir::Thumb, "kandinsky_30w_30h_thumb.png"));
}

#[tokio::test]
async fn test_resize_serves_existing_thumbnail() {
    // A thumbnail already on disk wins, even if it is not the requested size
    let assets = fuji_assets().with_file(
        StoreDir::Thumb,
        "mountfuji_200w_200h_thumb.jpg",
        &create_test_jpeg(10, 10),
    );
    let codec = CountingCodec::new();
    let router = test_router(&assets, codec.clone());

    let response = router
        .oneshot(get("/api/images?filename=mountfuji&width=200&height=200"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-thumbnail-cache-hit").unwrap(), "true");
    let body = body_bytes(response).await;
    assert_eq!(image_dimensions(&body), (10, 10));
    assert_eq!(codec.resize_count(), 0);
}

// =============================================================================
// Error Handling
// =============================================================================

#[tokio::test]
async fn test_missing_filename() {
    let assets = fuji_assets();
    let router = test_router(&assets, CountingCodec::new());

    for uri in ["/api/images", "/api/images?filename=", "/api/images?width=100"] {
        let response = router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Filename is required.");
        assert_eq!(json["status"], 400);
    }
}

#[tokio::test]
async fn test_invalid_number() {
    let assets = fuji_assets();
    let codec = CountingCodec::new();
    let router = test_router(&assets, codec.clone());

    for uri in [
        "/api/images?filename=mountfuji&width=abc",
        "/api/images?filename=mountfuji&height=-20",
        "/api/images?filename=mountfuji&width=.5",
    ] {
        let response = router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let json = body_json(response).await;
        assert_eq!(json["message"], "This must be a valid number.");
    }

    assert_eq!(codec.resize_count(), 0);
    assert!(assets.file_names(StoreDir::Thumb).is_empty());
}

#[tokio::test]
async fn test_decimal_dimensions_are_truncated() {
    let assets = fuji_assets();
    let router = test_router(&assets, CountingCodec::new());

    let response = router
        .oneshot(get("/api/images?filename=mountfuji&width=80.7&height=60"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-thumbnail-name").unwrap(),
        "mountfuji_80w_60h_thumb.jpg"
    );
}

#[tokio::test]
async fn test_unknown_image() {
    let assets = fuji_assets();
    let router = test_router(&assets, CountingCodec::new());

    let response = router
        .oneshot(get("/api/images?filename=argentina"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["message"],
        "The file argentina doesn't exist. Please, add it to the full directory and try again."
    );
}

#[tokio::test]
async fn test_prefix_does_not_match() {
    let assets = fuji_assets();
    let router = test_router(&assets, CountingCodec::new());

    for name in ["mount", "mountfuji.jpg", "MountFuji"] {
        let uri = format!("/api/images?filename={}", name);
        let response = router.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", name);
    }

    assert!(assets.file_names(StoreDir::Thumb).is_empty());
}

#[tokio::test]
async fn test_dimensions_above_maximum() {
    let assets = fuji_assets();
    let router = test_router_with(
        &assets,
        CountingCodec::new(),
        ThumbnailConfig::default().with_max_dimension(1000),
        RouterConfig::new(),
    );

    let response = router
        .oneshot(get("/api/images?filename=mountfuji&width=1001&height=10"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_dimensions");
}

#[tokio::test]
async fn test_corrupt_source_image() {
    let assets =
        TestAssets::new().with_file(StoreDir::Full, "broken.jpg", b"definitely not an image");
    let router = test_router(&assets, CountingCodec::new());

    let response = router
        .oneshot(get("/api/images?filename=broken"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = body_json(response).await;
    assert_eq!(json["error"], "unsupported_format");

    // Nothing half-written is left behind
    assert!(assets.file_names(StoreDir::Thumb).is_empty());
}

#[tokio::test]
async fn test_unsupported_source_format() {
    // GIF bytes uploaded under an accepted content type
    let assets = TestAssets::new();
    let router = test_router(&assets, CountingCodec::new());

    let response = router
        .clone()
        .oneshot(multipart_request(&[Part::file(
            "disguised.png",
            "image/png",
            create_test_gif(),
        )]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(get("/api/images?filename=disguised&width=10&height=10"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = body_json(response).await;
    assert_eq!(json["error"], "unsupported_format");
    assert!(assets.file_names(StoreDir::Thumb).is_empty());
}

#[tokio::test]
async fn test_hidden_source_is_not_resolved() {
    let assets = fuji_assets().with_file(StoreDir::Full, ".hidden", &create_test_jpeg(20, 20));
    let codec = CountingCodec::new();
    let router = test_router(&assets, codec.clone());

    let response = router
        .oneshot(get("/api/images?filename=.hidden"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["message"],
        "The file .hidden doesn't exist. Please, add it to the full directory and try again."
    );
    assert_eq!(codec.resize_count(), 0);
    assert!(assets.file_names(StoreDir::Thumb).is_empty());
}

#[tokio::test]
async fn test_missing_directories_are_server_errors() {
    let dir = tempfile::tempdir().unwrap();
    let assets = TestAssets {
        layout: thumb_server::StoreLayout::new(dir.path().join("absent")),
        dir,
    };
    let router = test_router(&assets, CountingCodec::new());

    let response = router
        .oneshot(get("/api/images?filename=mountfuji"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "storage_error");
}

// =============================================================================
// Static Files
// =============================================================================

#[tokio::test]
async fn test_serve_full_image() {
    let assets = fuji_assets();
    let original = assets.read_file(StoreDir::Full, "mountfuji.jpg");
    let router = test_router(&assets, CountingCodec::new());

    let response = router.oneshot(get("/full/mountfuji.jpg")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/jpeg");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(body_bytes(response).await.as_ref(), original.as_slice());
}

#[tokio::test]
async fn test_serve_generated_thumbnail() {
    let assets = fuji_assets();
    let router = test_router_with(
        &assets,
        CountingCodec::new(),
        ThumbnailConfig::default(),
        RouterConfig::new().with_cache_max_age(60),
    );

    let response = router
        .clone()
        .oneshot(get("/api/images?filename=mountfuji&width=50&height=50"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("cache-control").unwrap(), "public, max-age=60");

    let response = router
        .oneshot(get("/thumb/mountfuji_50w_50h_thumb.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert_eq!(image_dimensions(&body), (50, 50));
}

#[tokio::test]
async fn test_serve_missing_and_hidden_files() {
    let assets = fuji_assets().with_file(StoreDir::Thumb, ".secret", b"hidden");
    let router = test_router(&assets, CountingCodec::new());

    for uri in ["/full/argentina.jpg", "/thumb/.secret", "/thumb/mountfuji.jpg"] {
        let response = router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_cors_any_origin() {
    let assets = fuji_assets();
    let router = test_router(&assets, CountingCodec::new());

    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://gallery.example.com")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_unknown_route() {
    let assets = fuji_assets();
    let router = test_router(&assets, CountingCodec::new());

    let response = router.oneshot(get("/images/mountfuji")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
