//! Image codec adapter.
//!
//! The thumbnail service never touches pixels directly. It goes through the
//! [`Codec`] trait, which has two operations: resize an encoded image and
//! read the metadata of an encoded image.
//!
//! # Design Decisions
//!
//! - **Cover fit**: thumbnails are exactly the requested size. The source is
//!   scaled to cover the target box and the overflow is center-cropped, so
//!   the aspect ratio is never distorted.
//!
//! - **Same format out**: the thumbnail keeps the source format, which is why
//!   the thumbnail file name reuses the source extension.
//!
//! - **Synchronous**: codec work is CPU-bound; the service runs it on the
//!   blocking thread pool.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::Serialize;

use crate::error::CodecError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Content types accepted for uploads.
pub const ACCEPTED_UPLOAD_TYPES: &[&str] = &["image/png", "image/jpg", "image/jpeg"];

// =============================================================================
// Metadata
// =============================================================================

/// Basic facts about an encoded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Lowercase format name (e.g. "jpeg", "png")
    pub format: String,

    /// Encoded size in bytes
    pub size: u64,
}

impl ImageMetadata {
    /// MIME type matching the format, for HTTP responses.
    pub fn content_type(&self) -> &'static str {
        content_type_for_format(&self.format)
    }
}

// =============================================================================
// Codec Trait
// =============================================================================

/// Decode, resize and describe encoded images.
pub trait Codec: Send + Sync + 'static {
    /// Resize an encoded image to exactly `width` x `height` and re-encode it
    /// in the source format.
    fn resize(&self, source: &[u8], width: u32, height: u32) -> Result<Bytes, CodecError>;

    /// Read dimensions and format of an encoded image.
    fn metadata(&self, data: &[u8]) -> Result<ImageMetadata, CodecError>;
}

/// [`Codec`] backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct ImageCodec {
    quality: u8,
}

impl ImageCodec {
    /// Create a codec with the default JPEG quality.
    pub fn new() -> Self {
        Self::with_quality(DEFAULT_JPEG_QUALITY)
    }

    /// Create a codec with a specific JPEG quality (clamped to 1-100).
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: clamp_quality(quality),
        }
    }

    /// JPEG quality used when re-encoding JPEG thumbnails.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> Result<Bytes, CodecError> {
        let mut output = Vec::new();

        match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = img.to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut output, self.quality);
                encoder
                    .encode_image(&rgb)
                    .map_err(|e| CodecError::EncodeError {
                        message: e.to_string(),
                    })?;
            }
            ImageFormat::Png => {
                img.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
                    .map_err(|e| CodecError::EncodeError {
                        message: e.to_string(),
                    })?;
            }
            other => return Err(CodecError::UnsupportedFormat(format_name(other))),
        }

        Ok(Bytes::from(output))
    }
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for ImageCodec {
    fn resize(&self, source: &[u8], width: u32, height: u32) -> Result<Bytes, CodecError> {
        let format = detect_format(source)?;

        let img = image::load_from_memory_with_format(source, format).map_err(|e| {
            CodecError::DecodeError {
                message: e.to_string(),
            }
        })?;

        let resized = img.resize_to_fill(width, height, FilterType::Lanczos3);

        self.encode(&resized, format)
    }

    fn metadata(&self, data: &[u8]) -> Result<ImageMetadata, CodecError> {
        let format = detect_format(data)?;

        let reader = ImageReader::with_format(Cursor::new(data), format);
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| CodecError::DecodeError {
                message: e.to_string(),
            })?;

        Ok(ImageMetadata {
            width,
            height,
            format: format_name(format),
            size: data.len() as u64,
        })
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Detect the format of encoded bytes and check this build can decode it.
fn detect_format(data: &[u8]) -> Result<ImageFormat, CodecError> {
    let format = image::guess_format(data).map_err(|_| CodecError::UnknownFormat)?;

    // Signatures are known for formats whose decoders are not compiled in
    if !format.reading_enabled() {
        return Err(CodecError::UnsupportedFormat(format_name(format)));
    }

    Ok(format)
}

/// Lowercase name of an image format.
pub fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

/// MIME type for a format name as produced by [`format_name`].
pub fn content_type_for_format(format: &str) -> &'static str {
    match format {
        "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// MIME type for a file extension, used when serving stored files as-is.
pub fn content_type_for_extension(ext: Option<&str>) -> &'static str {
    match ext.map(str::to_ascii_lowercase).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Whether an upload's declared content type is accepted.
pub fn is_accepted_upload(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ACCEPTED_UPLOAD_TYPES.contains(&ct))
}

/// Validate JPEG quality parameter.
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
