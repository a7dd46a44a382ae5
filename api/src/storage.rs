//! Local storage for uploaded images.
//!
//! Files live flat under the uploads directory, which is also served
//! statically at `/uploads` so Instagram can fetch them by URL.

use image::ImageFormat;
use std::io;
use std::path::Path;

use crate::constants::ALLOWED_IMAGE_EXTENSIONS;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejected {
    #[error("Only image files are allowed (jpeg, jpg, png, webp, gif)")]
    UnsupportedType,
    #[error("Uploaded file is empty")]
    Empty,
}

/// Check an upload by extension, declared MIME type and content; returns the extension to store under
pub fn validate_image(
    original_name: &str,
    declared_mime: Option<&str>,
    data: &[u8],
) -> Result<&'static str, UploadRejected> {
    if data.is_empty() {
        return Err(UploadRejected::Empty);
    }

    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or(UploadRejected::UnsupportedType)?;
    let ext = ALLOWED_IMAGE_EXTENSIONS
        .iter()
        .copied()
        .find(|allowed| *allowed == ext)
        .ok_or(UploadRejected::UnsupportedType)?;

    let declared_ok = declared_mime
        .map(|m| m.strip_prefix("image/").is_some_and(|sub| ALLOWED_IMAGE_EXTENSIONS.contains(&sub)))
        .unwrap_or(false);
    if !declared_ok {
        return Err(UploadRejected::UnsupportedType);
    }

    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP | ImageFormat::Gif) => Ok(ext),
        _ => Err(UploadRejected::UnsupportedType),
    }
}

/// Write an upload, creating the directory if needed
pub async fn save_upload(dir: &Path, filename: &str, data: &[u8]) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(filename), data).await
}

/// Remove an upload; a file that is already gone is not an error
pub async fn remove_upload(dir: &Path, filename: &str) -> io::Result<()> {
    match tokio::fs::remove_file(dir.join(filename)).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(filename, "Upload already missing from disk");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

    #[test]
    fn test_accepts_matching_image() {
        assert_eq!(validate_image("pull.PNG", Some("image/png"), PNG_MAGIC), Ok("png"));
        assert_eq!(validate_image("box.jpg", Some("image/jpeg"), JPEG_MAGIC), Ok("jpg"));
    }

    #[test]
    fn test_rejects_wrong_extension_or_mime() {
        assert_eq!(
            validate_image("notes.txt", Some("image/png"), PNG_MAGIC),
            Err(UploadRejected::UnsupportedType)
        );
        assert_eq!(
            validate_image("pull.png", Some("application/pdf"), PNG_MAGIC),
            Err(UploadRejected::UnsupportedType)
        );
        assert_eq!(
            validate_image("pull", Some("image/png"), PNG_MAGIC),
            Err(UploadRejected::UnsupportedType)
        );
    }

    #[test]
    fn test_rejects_disguised_content() {
        assert_eq!(
            validate_image("evil.png", Some("image/png"), b"#!/bin/sh\necho hi"),
            Err(UploadRejected::UnsupportedType)
        );
        assert_eq!(
            validate_image("empty.png", Some("image/png"), b""),
            Err(UploadRejected::Empty)
        );
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = std::env::temp_dir().join(format!("igbot-uploads-{}", uuid::Uuid::new_v4()));

        save_upload(&dir, "a.png", PNG_MAGIC).await.unwrap();
        assert_eq!(tokio::fs::read(dir.join("a.png")).await.unwrap(), PNG_MAGIC);

        remove_upload(&dir, "a.png").await.unwrap();
        assert!(!dir.join("a.png").exists());

        // Second removal tolerates the missing file
        remove_upload(&dir, "a.png").await.unwrap();

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
