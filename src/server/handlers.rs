//! HTTP request handlers for the thumbnail API.
//!
//! # Endpoints
//!
//! - `GET /` - Liveness message
//! - `GET /health` - Health check endpoint
//! - `GET /api/images?filename=&width=&height=` - Serve (and create) a thumbnail
//! - `GET /api/images/list` - List generated thumbnails
//! - `POST /api/images/upload` - Upload full-size images
//! - `GET /full/{name}`, `GET /thumb/{name}` - Serve stored files

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{CodecError, StoreError, ThumbnailError};
use crate::store::{DirectoryStore, StoreDir};
use crate::thumbnail::{
    content_type_for_extension, extension, is_hidden, Codec, ImageRequest, ThumbnailService,
};

/// Multipart field carrying uploaded files.
pub const UPLOAD_FIELD: &str = "files";

/// Maximum number of files accepted by one upload request.
pub const MAX_UPLOAD_FILES: usize = 10;

/// Header reporting whether the thumbnail already existed.
pub const CACHE_HIT_HEADER: HeaderName = HeaderName::from_static("x-thumbnail-cache-hit");

/// Header carrying the stored thumbnail name.
pub const THUMBNAIL_NAME_HEADER: HeaderName = HeaderName::from_static("x-thumbnail-name");

const SERVER_UP_MESSAGE: &str = "Server is Up!";
const NO_THUMBNAILS_MESSAGE: &str = "There are not thumbnails created yet.";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the thumbnail service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: DirectoryStore, C: Codec> {
    /// The thumbnail service
    pub service: Arc<ThumbnailService<S, C>>,

    /// Cache-Control max-age in seconds for served images
    pub cache_max_age: u32,
}

impl<S: DirectoryStore, C: Codec> AppState<S, C> {
    /// Create a new application state with the default max-age (1 hour).
    pub fn new(service: ThumbnailService<S, C>) -> Self {
        Self::with_cache_max_age(service, 3600)
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(service: ThumbnailService<S, C>, cache_max_age: u32) -> Self {
        Self {
            service: Arc::new(service),
            cache_max_age,
        }
    }

    fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age)
    }
}

impl<S: DirectoryStore, C: Codec> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for thumbnail requests.
///
/// Dimensions are kept as strings so that non-numeric values produce the
/// API's own error message instead of a generic rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ResizeQueryParams {
    /// Logical name of the full image (no extension)
    #[serde(default)]
    pub filename: Option<String>,

    /// Target width in pixels (default: 200)
    #[serde(default)]
    pub width: Option<String>,

    /// Target height in pixels (default: 200)
    #[serde(default)]
    pub height: Option<String>,
}

/// Parse an optional dimension. Absent and empty values are `None`.
///
/// Only the leading digits are read, so `12.5` and `12px` both give `12`.
/// Values without leading digits, including negative ones, are rejected.
pub fn parse_dimension(field: &'static str, value: Option<&str>) -> Result<Option<u32>, ApiError> {
    let raw = match value.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    let unsigned = raw.strip_prefix('+').unwrap_or(raw);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());

    unsigned[..end]
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ApiError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Plain `{"message": ...}` response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// One entry of the thumbnail listing.
#[derive(Debug, Serialize)]
pub struct ListedThumbnail {
    /// Absolute URL of the thumbnail file
    pub filename: String,

    pub width: u32,
    pub height: u32,

    /// Encoded size in bytes
    pub size: u64,

    /// Lowercase format name
    pub format: String,
}

/// Response from the upload endpoint: the original names of stored files.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: Vec<String>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Log an error by severity and render it as JSON.
///
/// - 5xx errors are logged at ERROR level (server errors)
/// - 404s are logged at DEBUG level
/// - Other 4xx errors are logged at WARN level (client errors)
fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else if status.is_client_error() {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

/// Convert ThumbnailError to HTTP response.
impl IntoResponse for ThumbnailError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ThumbnailError::Store(store_err) => match store_err {
                StoreError::FileNotFound(_) => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    "File not found".to_string(),
                ),
                StoreError::InvalidName(name) => (
                    StatusCode::BAD_REQUEST,
                    "invalid_name",
                    format!("Invalid file name: {:?}", name),
                ),
                StoreError::DirectoryNotFound(_)
                | StoreError::PermissionDenied(_)
                | StoreError::Io { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    store_err.to_string(),
                ),
            },

            // Unrecognized or unsupported formats map to 415 Unsupported Media Type
            ThumbnailError::Decode {
                source: CodecError::UnknownFormat | CodecError::UnsupportedFormat(_),
                ..
            } => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_format",
                self.to_string(),
            ),
            ThumbnailError::Decode { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "codec_error",
                self.to_string(),
            ),

            ThumbnailError::InvalidDimensions { .. } => (
                StatusCode::BAD_REQUEST,
                "invalid_dimensions",
                self.to_string(),
            ),

            ThumbnailError::Timeout { .. } => {
                (StatusCode::GATEWAY_TIMEOUT, "timeout", self.to_string())
            }

            ThumbnailError::Task(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                self.to_string(),
            ),

            ThumbnailError::UnsupportedUpload { .. } => (
                StatusCode::BAD_REQUEST,
                "unsupported_upload",
                self.to_string(),
            ),
            ThumbnailError::EmptyUpload => {
                (StatusCode::BAD_REQUEST, "empty_upload", self.to_string())
            }
            ThumbnailError::TooManyFiles { .. } => {
                (StatusCode::BAD_REQUEST, "too_many_files", self.to_string())
            }
        };

        error_response(status, error_type, message)
    }
}

/// Errors raised by the handlers themselves, before or around the service.
#[derive(Debug)]
pub enum ApiError {
    /// `filename` query parameter is absent or empty
    MissingFilename,

    /// A dimension is not a non-negative integer
    InvalidNumber { field: &'static str, value: String },

    /// No full image has the requested logical name
    ImageNotFound { name: String },

    /// The multipart body could not be read
    Multipart { status: StatusCode, message: String },

    /// Any service error
    Thumbnail(ThumbnailError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingFilename => error_response(
                StatusCode::BAD_REQUEST,
                "missing_filename",
                "Filename is required.".to_string(),
            ),
            ApiError::InvalidNumber { field, value } => {
                debug!(field, value = %value, "Rejected dimension");
                error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_number",
                    "This must be a valid number.".to_string(),
                )
            }
            ApiError::ImageNotFound { name } => error_response(
                StatusCode::BAD_REQUEST,
                "image_not_found",
                format!(
                    "The file {} doesn't exist. Please, add it to the full directory and try again.",
                    name
                ),
            ),
            ApiError::Multipart { status, message } => {
                error_response(status, "invalid_multipart", message)
            }
            ApiError::Thumbnail(err) => err.into_response(),
        }
    }
}

impl From<ThumbnailError> for ApiError {
    fn from(err: ThumbnailError) -> Self {
        ApiError::Thumbnail(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle root requests.
///
/// # Endpoint
///
/// `GET /`
///
/// # Response
///
/// `200 OK` with `{"message": "Server is Up!"}`
pub async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse::new(SERVER_UP_MESSAGE))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle thumbnail requests.
///
/// # Endpoint
///
/// `GET /api/images?filename={name}&width={w}&height={h}`
///
/// # Query Parameters
///
/// - `filename`: Logical name of a full image, without extension (required)
/// - `width`, `height`: Target size in pixels (default: 200; `0` = default)
///
/// # Response
///
/// - `200 OK`: Thumbnail bytes with the image's content type
/// - `400 Bad Request`: Missing filename, non-numeric or out-of-range size, unknown image
/// - `415 Unsupported Media Type`: Source image cannot be decoded
/// - `500 Internal Server Error`: Storage or processing error
/// - `504 Gateway Timeout`: Codec exceeded the configured timeout
///
/// # Headers
///
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Thumbnail-Cache-Hit: true|false`
/// - `X-Thumbnail-Name: {stored thumbnail name}`
pub async fn resize_handler<S, C>(
    State(state): State<AppState<S, C>>,
    Query(query): Query<ResizeQueryParams>,
) -> Result<Response, ApiError>
where
    S: DirectoryStore + 'static,
    C: Codec,
{
    let name = query
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(ApiError::MissingFilename)?;

    let width = parse_dimension("width", query.width.as_deref())?;
    let height = parse_dimension("height", query.height.as_deref())?;

    let request = ImageRequest::with_defaults(name, width, height, state.service.config());

    let result = state
        .service
        .resolve(&request)
        .await?
        .ok_or_else(|| ApiError::ImageNotFound {
            name: name.to_string(),
        })?;

    let data = state
        .service
        .read(StoreDir::Thumb, &result.thumbnail_name)
        .await?;

    let headers = [
        (header::CONTENT_TYPE, result.metadata.content_type().to_string()),
        (header::CACHE_CONTROL, state.cache_control()),
        (CACHE_HIT_HEADER, result.cache_hit.to_string()),
        (THUMBNAIL_NAME_HEADER, result.thumbnail_name),
    ];

    Ok((StatusCode::OK, headers, Body::from(data)).into_response())
}

/// Handle thumbnail listing requests.
///
/// # Endpoint
///
/// `GET /api/images/list`
///
/// # Response
///
/// `200 OK` with a JSON array:
/// ```json
/// [
///   {
///     "filename": "http://localhost:5000/thumb/mountfuji_200w_200h_thumb.jpg",
///     "width": 200,
///     "height": 200,
///     "size": 8141,
///     "format": "jpeg"
///   }
/// ]
/// ```
///
/// or `{"message": "There are not thumbnails created yet."}` when empty.
pub async fn list_handler<S, C>(
    State(state): State<AppState<S, C>>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    S: DirectoryStore + 'static,
    C: Codec,
{
    let thumbnails = state.service.list_thumbnails().await?;

    if thumbnails.is_empty() {
        return Ok(Json(MessageResponse::new(NO_THUMBNAILS_MESSAGE)).into_response());
    }

    let base = base_url(&headers);
    let listed: Vec<ListedThumbnail> = thumbnails
        .into_iter()
        .map(|thumb| ListedThumbnail {
            filename: format!("{}/{}/{}", base, StoreDir::Thumb, thumb.name),
            width: thumb.metadata.width,
            height: thumb.metadata.height,
            size: thumb.metadata.size,
            format: thumb.metadata.format,
        })
        .collect();

    Ok(Json(listed).into_response())
}

/// An upload read from the multipart body but not stored yet.
struct PendingUpload {
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Handle upload requests.
///
/// # Endpoint
///
/// `POST /api/images/upload` (multipart, field `files`, up to 10 files)
///
/// Every file is checked before any is stored, so a request rejected by
/// validation leaves the store untouched. A storage failure partway through
/// the batch keeps the files already written.
///
/// # Response
///
/// - `200 OK`: `{"message": ["original-name.jpg", ...]}`
/// - `400 Bad Request`: `"Only .png, .jpg and .jpeg format allowed!"`,
///   `"Please add at least one image to upload"`, too many files, bad name
/// - `413 Payload Too Large`: body exceeds the configured limit
pub async fn upload_handler<S, C>(
    State(state): State<AppState<S, C>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError>
where
    S: DirectoryStore + 'static,
    C: Codec,
{
    let mut pending = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        // Text parts under the same name are not files
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        if pending.len() == MAX_UPLOAD_FILES {
            return Err(ThumbnailError::TooManyFiles {
                max: MAX_UPLOAD_FILES,
            }
            .into());
        }

        let content_type = field.content_type().map(str::to_string);
        state
            .service
            .check_upload(&file_name, content_type.as_deref())?;

        let data = field.bytes().await?;
        pending.push(PendingUpload {
            file_name,
            content_type,
            data,
        });
    }

    if pending.is_empty() {
        return Err(ThumbnailError::EmptyUpload.into());
    }

    let mut stored = Vec::with_capacity(pending.len());
    for upload in pending {
        state
            .service
            .store_upload(&upload.file_name, upload.content_type.as_deref(), upload.data)
            .await?;
        stored.push(upload.file_name);
    }

    info!(count = stored.len(), "Upload complete");
    Ok(Json(UploadResponse { message: stored }))
}

/// Handle requests for stored full-size images.
///
/// # Endpoint
///
/// `GET /full/{name}`
pub async fn full_file_handler<S, C>(
    State(state): State<AppState<S, C>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError>
where
    S: DirectoryStore + 'static,
    C: Codec,
{
    serve_file(&state, StoreDir::Full, &name).await
}

/// Handle requests for stored thumbnails.
///
/// # Endpoint
///
/// `GET /thumb/{name}`
pub async fn thumb_file_handler<S, C>(
    State(state): State<AppState<S, C>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError>
where
    S: DirectoryStore + 'static,
    C: Codec,
{
    serve_file(&state, StoreDir::Thumb, &name).await
}

async fn serve_file<S, C>(
    state: &AppState<S, C>,
    dir: StoreDir,
    name: &str,
) -> Result<Response, ApiError>
where
    S: DirectoryStore + 'static,
    C: Codec,
{
    // Dot-files are never served
    if is_hidden(name) {
        return Err(ThumbnailError::Store(StoreError::FileNotFound(name.to_string())).into());
    }

    let data = state.service.read(dir, name).await?;

    let headers = [
        (
            header::CONTENT_TYPE,
            content_type_for_extension(extension(name)).to_string(),
        ),
        (header::CACHE_CONTROL, state.cache_control()),
    ];

    Ok((StatusCode::OK, headers, Body::from(data)).into_response())
}

/// `<proto>://<host>` of the incoming request.
///
/// Honors `X-Forwarded-Proto` and `X-Forwarded-Host` when a proxy sets them.
fn base_url(headers: &HeaderMap) -> String {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let proto = header_str("x-forwarded-proto").unwrap_or("http");
    let host = header_str("x-forwarded-host")
        .or_else(|| header_str(header::HOST.as_str()))
        .unwrap_or("localhost");

    format!("{}://{}", proto, host)
}

// =============================================================================
// Tests
// =============================================================================
