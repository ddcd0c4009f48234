//! Uploaded images and the remote image store
//!
//! Provides:
//! - `ImageUpload`, the in-memory image handed to the caption model and the store
//! - `ImageStore`, the seam in front of the CDN (upload + delete by file id)
//! - `ImageKitClient`, the production store

mod imagekit;

pub use imagekit::{ImageKitClient, ImageKitClientBuilder};

use std::path::Path;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// MIME types accepted for post images
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Maximum post image size (4 MB)
pub const MAX_POST_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// Maximum profile picture size (2 MB)
pub const MAX_PROFILE_PICTURE_BYTES: usize = 2 * 1024 * 1024;

/// An image held in memory, ready to be captioned and uploaded
#[derive(Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("size", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

impl ImageUpload {
    /// Wrap raw bytes with an explicit MIME type
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            file_name: None,
        }
    }

    /// Wrap raw bytes, sniffing the MIME type from the magic bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mime_type = detect_mime_type(&bytes).to_string();
        Self::new(bytes, mime_type)
    }

    /// Read an image from disk
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;

        let mut mime_type = detect_mime_type(&bytes);
        if mime_type == UNKNOWN_MIME_TYPE {
            mime_type = mime_from_extension(path);
        }

        Ok(Self {
            bytes,
            mime_type: mime_type.to_string(),
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Collect every validation problem with this image
    pub fn validate(&self, max_bytes: usize) -> Vec<String> {
        let mut errors = Vec::new();

        if !ALLOWED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            errors.push("Invalid file type. Only JPEG, PNG, and WebP are allowed".to_string());
        }
        if self.bytes.len() > max_bytes {
            errors.push(format!(
                "File too large. Maximum size is {}MB",
                max_bytes / (1024 * 1024)
            ));
        }

        errors
    }

    /// Base64 (no data-URL prefix) encoding of the bytes
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Detect MIME type from image bytes
pub fn detect_mime_type(data: &[u8]) -> &'static str {
    match image::guess_format(data) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::WebP) => "image/webp",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::Bmp) => "image/bmp",
        Ok(image::ImageFormat::Tiff) => "image/tiff",
        _ => UNKNOWN_MIME_TYPE,
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => UNKNOWN_MIME_TYPE,
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub url: String,
    pub file_id: String,
}

/// Remote image storage
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload the bytes under the given file name
    async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<StoredImage>;

    /// Delete a previously uploaded file
    async fn delete(&self, file_id: &str) -> Result<()>;
}

/// Validation failure for an image, or `Ok` if it's acceptable
pub fn ensure_valid(image: &ImageUpload, max_bytes: usize) -> Result<()> {
    let errors = image.validate(max_bytes);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::ValidationFailed(errors))
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    /// Minimal PNG signature + IHDR prefix
    pub const PNG_BYTES: [u8; 16] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    /// JPEG SOI + APP0 marker
    pub const JPEG_BYTES: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    #[test]
    fn test_detect_mime_type() {
        assert_eq!(detect_mime_type(&PNG_BYTES), "image/png");
        assert_eq!(detect_mime_type(&JPEG_BYTES), "image/jpeg");

        let mut webp = vec![0u8; 16];
        webp[0..4].copy_from_slice(b"RIFF");
        webp[8..12].copy_from_slice(b"WEBP");
        assert_eq!(detect_mime_type(&webp), "image/webp");

        assert_eq!(detect_mime_type(b"not an image"), UNKNOWN_MIME_TYPE);
    }

    #[test]
    fn test_validate_accepts_png() {
        let image = ImageUpload::from_bytes(PNG_BYTES.to_vec());
        assert!(image.validate(MAX_POST_IMAGE_BYTES).is_empty());
        assert!(ensure_valid(&image, MAX_POST_IMAGE_BYTES).is_ok());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let image = ImageUpload::new(vec![0u8; 64], "image/gif");
        let errors = image.validate(32);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("Invalid file type"));
        assert!(errors[1].contains("File too large"));
    }

    #[test]
    fn test_validate_size_limit() {
        let image = ImageUpload::new(vec![0u8; MAX_PROFILE_PICTURE_BYTES + 1], "image/jpeg");
        assert!(image.validate(MAX_POST_IMAGE_BYTES).is_empty());

        let err = ensure_valid(&image, MAX_PROFILE_PICTURE_BYTES).unwrap_err();
        assert!(err.to_string().contains("Maximum size is 2MB"));
    }

    #[test]
    fn test_jpg_alias_is_allowed() {
        let image = ImageUpload::new(JPEG_BYTES.to_vec(), "image/jpg");
        assert!(image.validate(MAX_POST_IMAGE_BYTES).is_empty());
    }

    #[test]
    fn test_to_base64() {
        let image = ImageUpload::new(b"hi".to_vec(), "image/png");
        assert_eq!(image.to_base64(), "aGk=");
    }

    #[tokio::test]
    async fn test_from_path_uses_extension_when_sniffing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.webp");
        tokio::fs::write(&path, b"opaque").await.unwrap();

        let image = ImageUpload::from_path(&path).await.unwrap();
        assert_eq!(image.mime_type, "image/webp");
        assert_eq!(image.file_name.as_deref(), Some("photo.webp"));
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let result = ImageUpload::from_path("/definitely/not/here.png").await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
