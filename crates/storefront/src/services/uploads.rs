//! Product image storage on the local filesystem.
//!
//! Files are written under the configured upload directory with random
//! names and served back from `/uploads/`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Maximum accepted file size (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Accepted file extensions.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Errors from storing an image.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file is empty")]
    Empty,

    #[error("file is larger than {} MB", MAX_IMAGE_BYTES / 1024 / 1024)]
    TooLarge,

    #[error("unsupported file type '{0}' (allowed: png, jpg, jpeg, gif, webp)")]
    UnsupportedType(String),

    #[error("file content does not match its extension")]
    NotAnImage,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the error is the uploader's fault rather than ours.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Writes uploaded images to disk.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the images live in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and store one image, returning its public URL.
    ///
    /// # Errors
    ///
    /// Returns `UploadError` if the file is empty, too large, of an
    /// unsupported type, or cannot be written.
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn save(&self, original_name: &str, data: &[u8]) -> Result<String, UploadError> {
        let ext = validate_image(original_name, data)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let filename = format!("{}.{ext}", Uuid::new_v4());
        tokio::fs::write(self.dir.join(&filename), data).await?;

        tracing::info!(%filename, "Stored product image");
        Ok(format!("{PUBLIC_PREFIX}/{filename}"))
    }
}

/// Check size, extension and magic bytes. Returns the normalized extension.
fn validate_image(original_name: &str, data: &[u8]) -> Result<String, UploadError> {
    if data.is_empty() {
        return Err(UploadError::Empty);
    }
    if data.len() > MAX_IMAGE_BYTES {
        return Err(UploadError::TooLarge);
    }

    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UploadError::UnsupportedType(ext));
    }

    let looks_right = match ext.as_str() {
        "png" => data.starts_with(b"\x89PNG\r\n\x1a\n"),
        "jpg" | "jpeg" => data.starts_with(&[0xFF, 0xD8, 0xFF]),
        "gif" => data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a"),
        "webp" => data.len() >= 12 && data.starts_with(b"RIFF") && data.get(8..12) == Some(&b"WEBP"[..]),
        _ => false,
    };
    if !looks_right {
        return Err(UploadError::NotAnImage);
    }

    let ext = if ext == "jpeg" { "jpg".to_string() } else { ext };
    Ok(ext)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[tokio::test]
    async fn test_save_writes_file_with_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("uploads"));

        let url = store.save("Basket Photo.PNG", PNG).await.unwrap();
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".png"));

        let name = url.trim_start_matches("/uploads/");
        let written = tokio::fs::read(store.dir().join(name)).await.unwrap();
        assert_eq!(written, PNG);
    }

    #[test]
    fn test_rejects_bad_uploads() {
        assert!(matches!(validate_image("a.png", b""), Err(UploadError::Empty)));
        assert!(matches!(
            validate_image("a.exe", PNG),
            Err(UploadError::UnsupportedType(ext)) if ext == "exe"
        ));
        assert!(matches!(
            validate_image("a.jpg", PNG),
            Err(UploadError::NotAnImage)
        ));
        let huge = vec![0xFF; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            validate_image("a.jpg", &huge),
            Err(UploadError::TooLarge)
        ));
        assert_eq!(validate_image("a.JPEG", &[0xFF, 0xD8, 0xFF, 0xE0]).unwrap(), "jpg");
    }
}
