use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by a directory store while listing, reading or writing files.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store directory itself does not exist
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    /// A file inside a store directory does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The process is not allowed to access the path
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// File name is empty or would escape the store directory
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    /// Any other filesystem failure
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

impl StoreError {
    /// Map an I/O error raised while accessing a directory.
    pub fn from_dir_io(err: &std::io::Error, path: &Path) -> Self {
        match err.kind() {
            ErrorKind::NotFound => StoreError::DirectoryNotFound(path.display().to_string()),
            _ => Self::from_other_io(err, path),
        }
    }

    /// Map an I/O error raised while accessing a single file.
    pub fn from_file_io(err: &std::io::Error, path: &Path) -> Self {
        match err.kind() {
            ErrorKind::NotFound => StoreError::FileNotFound(path.display().to_string()),
            _ => Self::from_other_io(err, path),
        }
    }

    fn from_other_io(err: &std::io::Error, path: &Path) -> Self {
        match err.kind() {
            ErrorKind::PermissionDenied => {
                StoreError::PermissionDenied(path.display().to_string())
            }
            _ => StoreError::Io {
                path: path.display().to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Errors raised by the image codec.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// The bytes do not start with any known image signature
    #[error("Unrecognized image format")]
    UnknownFormat,

    /// The format was recognized but this build cannot process it
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The image data is corrupt or truncated
    #[error("Failed to decode image: {message}")]
    DecodeError { message: String },

    /// Re-encoding the resized image failed
    #[error("Failed to encode image: {message}")]
    EncodeError { message: String },
}

/// Errors produced while resolving, generating or storing thumbnails.
///
/// A missing source image is not an error: `ThumbnailService::resolve`
/// reports it as `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum ThumbnailError {
    /// Directory listing, read or write failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The codec could not process an image
    #[error("Cannot process {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: CodecError,
    },

    /// Requested width or height is zero or above the configured maximum
    #[error("Invalid dimensions {width}x{height} (each side must be 1-{max})")]
    InvalidDimensions { width: u32, height: u32, max: u32 },

    /// The codec did not finish within the configured limit
    #[error("Processing {name} timed out after {limit:?}")]
    Timeout { name: String, limit: Duration },

    /// The blocking codec task panicked or was cancelled
    #[error("Codec task failed: {0}")]
    Task(String),

    /// Upload rejected because of its declared content type
    #[error("Only .png, .jpg and .jpeg format allowed!")]
    UnsupportedUpload { file_name: String },

    /// Upload request carried no files
    #[error("Please add at least one image to upload")]
    EmptyUpload,

    /// Upload request carried more files than allowed
    #[error("Too many files: at most {max} images per upload")]
    TooManyFiles { max: usize },
}
