//! File naming rules for full images and thumbnails.
//!
//! A stored file is identified by its *logical name*: the file name with
//! exactly one trailing extension removed. `mountfuji.jpg` has the logical
//! name `mountfuji`, `a.b.png` has `a.b`, and a dot-file such as `.keep` has
//! no extension at all.
//!
//! Thumbnails use the canonical form
//!
//! ```text
//! <base>_<width>w_<height>h_thumb.<ext>
//! ```
//!
//! where `base` and `ext` come from the matched full image.

use std::fmt;

/// Literal suffix closing every thumbnail logical name.
pub const THUMBNAIL_SUFFIX: &str = "_thumb";

/// Split a file name into its logical name and extension.
///
/// Only the last `.` separates an extension. A leading `.` does not, and an
/// empty extension (`"name."`) is treated as no extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        None | Some(0) => (name, None),
        Some(pos) => {
            let ext = &name[pos + 1..];
            (&name[..pos], (!ext.is_empty()).then_some(ext))
        }
    }
}

/// Logical name of a stored file (its name minus one trailing extension).
#[inline]
pub fn logical_name(name: &str) -> &str {
    split_extension(name).0
}

/// Extension of a stored file, if any.
#[inline]
pub fn extension(name: &str) -> Option<&str> {
    split_extension(name).1
}

/// Whether a listing entry is a dot-file.
#[inline]
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Return the listing entries whose logical name equals `logical`.
///
/// The comparison is exact: `mount` does not match `mountfuji.jpg`. Matches
/// keep the order of `listing`, and an empty result means the image does not
/// exist.
pub fn match_logical_name<S: AsRef<str>>(listing: &[S], logical: &str) -> Vec<String> {
    listing
        .iter()
        .map(AsRef::as_ref)
        .filter(|entry| logical_name(entry) == logical)
        .map(str::to_string)
        .collect()
}

/// Normalize an uploaded file name for storage: lowercase, spaces become `-`.
pub fn normalize_upload_name(original: &str) -> String {
    original.to_lowercase().replace(' ', "-")
}

// =============================================================================
// Thumbnail Name
// =============================================================================

/// Canonical name of a thumbnail derived from its source and target size.
///
/// Two names built from the same base, size and extension are always equal,
/// which is what lets a later request find an earlier request's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailName {
    base: String,
    width: u32,
    height: u32,
    extension: Option<String>,
}

impl ThumbnailName {
    /// Build a thumbnail name from its parts.
    pub fn new(base: impl Into<String>, width: u32, height: u32, extension: Option<&str>) -> Self {
        Self {
            base: base.into(),
            width,
            height,
            extension: extension.map(str::to_string),
        }
    }

    /// Build the thumbnail name for a stored full image.
    pub fn for_source(source_name: &str, width: u32, height: u32) -> Self {
        let (base, ext) = split_extension(source_name);
        Self::new(base, width, height, ext)
    }

    /// Logical name of the thumbnail (`<base>_<w>w_<h>h_thumb`).
    pub fn logical(&self) -> String {
        format!(
            "{}_{}w_{}h{}",
            self.base, self.width, self.height, THUMBNAIL_SUFFIX
        )
    }

    /// Base name of the source image.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Target width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Target height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Extension inherited from the source image.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }
}

impl fmt::Display for ThumbnailName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.extension {
            Some(ext) => write!(f, "{}.{}", self.logical(), ext),
            None => f.write_str(&self.logical()),
        }
    }
}
