use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;

/// Extensions and MIME subtypes accepted for uploads.
const ALLOWED_IMAGE_TYPES: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

/// The URL is untrusted input: require a well-formed absolute http(s) URL
/// before any network activity.
pub fn parse_image_url(raw: &str) -> Result<reqwest::Url, ApiError> {
    let url = reqwest::Url::parse(raw)
        .map_err(|_| ApiError::Validation("Invalid URL format".into()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::Validation("Invalid URL format".into()));
    }
    Ok(url)
}

/// Download image bytes from a remote URL. The shared client carries the
/// 10s timeout, so a slow host cannot pin the request indefinitely.
pub async fn fetch_remote_image(
    http: &reqwest::Client,
    url: reqwest::Url,
) -> Result<Bytes, ApiError> {
    let download_failed = |e: reqwest::Error| {
        warn!(error = %e, "image download failed");
        ApiError::Acquisition("Failed to download image from URL".into())
    };

    let response = http
        .get(url)
        .send()
        .await
        .map_err(download_failed)?
        .error_for_status()
        .map_err(download_failed)?;

    response.bytes().await.map_err(download_failed)
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Both the file extension and the declared MIME type must name an allowed
/// image format. Runs before any decoding.
pub fn validate_upload(filename: &str, mime: &str) -> Result<(), ApiError> {
    let ext_ok = extension_of(filename)
        .map(|ext| ALLOWED_IMAGE_TYPES.contains(&ext.as_str()))
        .unwrap_or(false);
    let mime_ok = mime
        .strip_prefix("image/")
        .map(|subtype| ALLOWED_IMAGE_TYPES.contains(&subtype))
        .unwrap_or(false);

    if ext_ok && mime_ok {
        Ok(())
    } else {
        Err(ApiError::Acquisition("Only image files are allowed!".into()))
    }
}

/// Write the raw upload to durable storage under a generated unique name,
/// so the original survives even if later pipeline steps fail. Returns the
/// stored path for the Image row.
pub async fn store_upload(
    upload_dir: &str,
    original_name: &str,
    data: &[u8],
) -> anyhow::Result<String> {
    let ext = extension_of(original_name).unwrap_or_else(|| "jpg".into());
    let unique = format!("image-{}.{}", Uuid::new_v4(), ext);
    let path = Path::new(upload_dir).join(unique);

    tokio::fs::write(&path, data)
        .await
        .with_context(|| format!("write upload to {}", path.display()))?;

    Ok(path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_http_urls() {
        assert!(parse_image_url("https://example.com/a.jpg").is_ok());
        assert!(parse_image_url("http://example.com/a.jpg?x=1").is_ok());
    }

    #[test]
    fn rejects_relative_and_malformed_urls() {
        assert!(parse_image_url("").is_err());
        assert!(parse_image_url("/images/a.jpg").is_err());
        assert!(parse_image_url("example.com/a.jpg").is_err());
        assert!(parse_image_url("not a url").is_err());
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(parse_image_url("file:///etc/passwd").is_err());
        assert!(parse_image_url("ftp://example.com/a.jpg").is_err());
    }

    #[test]
    fn upload_validation_requires_both_extension_and_mime() {
        assert!(validate_upload("photo.jpg", "image/jpeg").is_ok());
        assert!(validate_upload("PHOTO.JPG", "image/jpeg").is_ok());
        assert!(validate_upload("a.webp", "image/webp").is_ok());

        // A .txt renamed to .jpg still declares the wrong MIME type.
        assert!(validate_upload("notes.jpg", "text/plain").is_err());
        // Matching MIME but wrong extension.
        assert!(validate_upload("photo.txt", "image/jpeg").is_err());
        assert!(validate_upload("photo", "image/jpeg").is_err());
        assert!(validate_upload("a.svg", "image/svg+xml").is_err());
        assert!(validate_upload("a.jpg", "application/octet-stream").is_err());
    }

    #[tokio::test]
    async fn stores_upload_under_a_unique_name() {
        let dir = std::env::temp_dir().join("facelens-store-upload-test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let dir = dir.to_string_lossy().into_owned();

        let a = store_upload(&dir, "cat.png", b"abc").await.unwrap();
        let b = store_upload(&dir, "cat.png", b"def").await.unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
        assert_eq!(tokio::fs::read(&a).await.unwrap(), b"abc");
        assert_eq!(tokio::fs::read(&b).await.unwrap(), b"def");
    }
}
