//! Filesystem-backed directory store.
//!
//! Writes go through a temporary file in the target directory followed by a
//! rename, so a thumbnail is either absent or complete. Two processes that
//! generate the same thumbnail concurrently both succeed and the last rename
//! wins; the content is identical because it is a pure function of the
//! source image and requested size.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::StoreError;

use super::directory::{validate_name, DirectoryStore, StoreDir, StoreLayout};

/// [`DirectoryStore`] over two local directories.
#[derive(Debug, Clone)]
pub struct FsStore {
    layout: StoreLayout,
    identifier: String,
}

impl FsStore {
    /// Create a store for the given layout. Directories are not created.
    pub fn new(layout: StoreLayout) -> Self {
        let identifier = format!("file://{}", layout.root.display());
        Self { layout, identifier }
    }

    /// Get the store layout.
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Create both collection directories if they are missing.
    pub async fn ensure_layout(&self) -> Result<(), StoreError> {
        for dir in [StoreDir::Full, StoreDir::Thumb] {
            let path = self.layout.dir_path(dir);
            tokio::fs::create_dir_all(&path)
                .await
                .map_err(|e| StoreError::from_dir_io(&e, &path))?;
        }
        Ok(())
    }

    fn file_path(&self, dir: StoreDir, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.layout.dir_path(dir).join(name))
    }
}

#[async_trait]
impl DirectoryStore for FsStore {
    async fn list_entries(&self, dir: StoreDir) -> Result<Vec<String>, StoreError> {
        let path = self.layout.dir_path(dir);
        let mut read_dir = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| StoreError::from_dir_io(&e, &path))?;

        let mut names = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| StoreError::from_dir_io(&e, &path))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StoreError::from_file_io(&e, &entry.path()))?;
            if !file_type.is_file() {
                continue;
            }
            // Non UTF-8 names cannot be requested over HTTP anyway
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn read_file(&self, dir: StoreDir, name: &str) -> Result<Bytes, StoreError> {
        let path = self.file_path(dir, name)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| StoreError::from_file_io(&e, &path))?;
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, dir: StoreDir, name: &str, data: Bytes) -> Result<(), StoreError> {
        let path = self.file_path(dir, name)?;
        let parent = self.layout.dir_path(dir);

        let written = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&parent, &written, &data))
            .await
            .map_err(|e| StoreError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })??;

        debug!(dir = %dir, name = name, "Wrote file");
        Ok(())
    }

    async fn exists(&self, dir: StoreDir, name: &str) -> Result<bool, StoreError> {
        let path = self.file_path(dir, name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::from_file_io(&e, &path)),
        }
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Write `data` to a temp file inside `parent`, then rename it onto `path`.
///
/// The temp file lives in the same directory so the rename never crosses a
/// filesystem boundary.
fn write_atomic(parent: &Path, path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut tmp =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| StoreError::from_dir_io(&e, parent))?;

    tmp.write_all(data)
        .map_err(|e| StoreError::from_file_io(&e, tmp.path()))?;

    tmp.persist(path)
        .map_err(|e| StoreError::from_file_io(&e.error, path))?;

    Ok(())
}
