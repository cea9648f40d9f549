//! Image upload store
//!
//! Validates and writes uploaded images into the configured upload directory
//! and removes them again when the article referencing them changes.
//! Stored files are addressed by their public path (`/uploads/<filename>`).

use crate::config::UploadConfig;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Upload failures
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Only image files are allowed")]
    InvalidType,

    #[error("File too large. Maximum size is {}MB", .max_bytes / (1024 * 1024))]
    TooLarge { max_bytes: u64 },

    #[error("No file provided")]
    MissingFile,

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

/// A file written to the upload directory
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    /// Public path, e.g. `/uploads/podium-1718000000000-123456789.jpg`
    pub path: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

/// Image store backed by a local directory
#[derive(Debug, Clone)]
pub struct ImageStore {
    config: UploadConfig,
}

impl ImageStore {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Check extension, MIME type and size; returns the lowercased extension.
    pub fn validate(
        &self,
        original_name: &str,
        content_type: &str,
        size: u64,
    ) -> Result<String, UploadError> {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or(UploadError::InvalidType)?;

        if !self.config.is_extension_allowed(&ext) || !self.config.is_mime_allowed(content_type) {
            return Err(UploadError::InvalidType);
        }
        if size > self.config.max_file_size {
            return Err(UploadError::TooLarge {
                max_bytes: self.config.max_file_size,
            });
        }
        Ok(ext)
    }

    /// Validate and write an image, returning where it was stored.
    pub async fn save(
        &self,
        original_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<StoredImage, UploadError> {
        let ext = self.validate(original_name, content_type, data.len() as u64)?;

        tokio::fs::create_dir_all(&self.config.path).await?;
        let filename = generate_filename(original_name, &ext);
        tokio::fs::write(self.config.path.join(&filename), data).await?;

        tracing::info!("Stored upload {} ({} bytes)", filename, data.len());
        Ok(StoredImage {
            path: format!("{}/{}", self.config.public_prefix.trim_end_matches('/'), filename),
            filename,
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    /// Map a public path to a file inside the upload directory.
    ///
    /// Returns `None` for paths outside the public prefix or that try to
    /// leave the directory.
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let prefix = format!("{}/", self.config.public_prefix.trim_end_matches('/'));
        let filename = public_path.strip_prefix(&prefix)?;
        if filename.is_empty()
            || filename.contains("..")
            || filename.contains('/')
            || filename.contains('\\')
        {
            return None;
        }
        Some(self.config.path.join(filename))
    }

    /// Remove a stored image by its public path.
    ///
    /// Returns whether a file was removed. Missing files and foreign paths are
    /// not errors.
    pub fn delete(&self, public_path: &str) -> bool {
        let Some(path) = self.resolve(public_path) else {
            tracing::warn!("Refusing to delete path outside uploads: {}", public_path);
            return false;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Deleted upload {:?}", path);
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!("Failed to delete upload {:?}: {}", path, e);
                false
            }
        }
    }
}

/// `<basename>-<unix millis>-<random>.<ext>` with the basename reduced to
/// `[A-Za-z0-9_-]`
fn generate_filename(original_name: &str, ext: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let mut base: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect();
    if base.is_empty() {
        base.push_str("image");
    }
    let random = Uuid::new_v4().as_u128() % 1_000_000_000;
    format!("{}-{}-{}.{}", base, Utc::now().timestamp_millis(), random, ext)
}
