//! Local file storage for media payloads, decoupled from the relational
//! store.
//!
//! Files live under `<data_dir>/blobs/`, named by a random UUID or a
//! caller-supplied asset identifier (URL-encoded), with an extension matching
//! the content type. Block rows reference blobs by relative path; the owning
//! block's deletion is the only path that deletes the file.

use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

const BLOB_DIR: &str = "blobs";

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("path escapes the blob directory: {0}")]
    InvalidPath(String),
}

/// Returns true when a block's content references a blob store file rather
/// than holding inline text or a URL.
pub fn is_blob_path(content: &str) -> bool {
    content.starts_with("blobs/")
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: data_dir.into().join(BLOB_DIR),
        }
    }

    /// Writes a payload under a fresh UUID name. Returns the relative path
    /// to store in the owning block's content.
    pub fn store(&self, bytes: &[u8], content_type: &str) -> Result<String, BlobError> {
        self.write_file(&Uuid::new_v4().to_string(), bytes, content_type)
    }

    /// Writes a payload under a caller-supplied asset identifier,
    /// URL-encoded so it is always a valid single file name.
    pub fn store_named(
        &self,
        asset_id: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, BlobError> {
        self.write_file(&urlencoding::encode(asset_id), bytes, content_type)
    }

    pub fn delete(&self, relative: &str) -> Result<(), BlobError> {
        Ok(std::fs::remove_file(self.resolve(relative)?)?)
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.resolve(relative).map(|p| p.exists()).unwrap_or(false)
    }

    /// Maps a stored relative path to an absolute one, rejecting anything
    /// that would resolve outside the blob directory.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, BlobError> {
        let name = relative
            .strip_prefix("blobs/")
            .ok_or_else(|| BlobError::InvalidPath(relative.to_string()))?;
        if name.contains("..") || name.contains('/') {
            return Err(BlobError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(name))
    }

    fn write_file(
        &self,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, BlobError> {
        std::fs::create_dir_all(&self.root)?;

        let file_name = match extension_for(content_type) {
            Some(ext) => format!("{}.{}", name, ext),
            None => name.to_string(),
        };
        std::fs::write(self.root.join(&file_name), bytes)?;

        Ok(format!("{}/{}", BLOB_DIR, file_name))
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    // jpeg maps to several candidates; prefer the conventional one
    if content_type == "image/jpeg" {
        return Some("jpg");
    }
    mime_guess::get_mime_extensions_str(content_type).and_then(|exts| exts.first().copied())
}
