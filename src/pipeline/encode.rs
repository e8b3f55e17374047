//! Image encoding: attached photo → base64 payload for a `data:` URI.
//!
//! KML viewers render the placemark description as HTML, so the photo is
//! inlined as `<img src="data:image/jpeg;base64,…">` and the exported file
//! stays self-contained. This is the only stage that suspends: the file is
//! read with `tokio::fs`, and the base64 pass runs on the blocking pool
//! because a phone photo can be several megabytes.
//!
//! Every call is bounded by a timeout. An image that never finishes is an
//! error, and the caller decides whether to retry or drop the record.

use crate::error::AlertError;
use crate::record::EncodedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Where an attached image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A file on disk; read asynchronously.
    Path(PathBuf),
    /// Bytes already in memory. `mime_type` overrides sniffing when set.
    Bytes {
        bytes: Vec<u8>,
        mime_type: Option<String>,
    },
}

impl ImageSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ImageSource::Path(path.into())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        ImageSource::Bytes {
            bytes: bytes.into(),
            mime_type: None,
        }
    }
}

/// Read and encode an image, giving up after `timeout`.
pub async fn encode_image(source: ImageSource, timeout: Duration) -> Result<EncodedImage, AlertError> {
    bounded(encode_unbounded(source), timeout).await
}

async fn bounded<F>(encode: F, timeout: Duration) -> Result<EncodedImage, AlertError>
where
    F: Future<Output = Result<EncodedImage, AlertError>>,
{
    match tokio::time::timeout(timeout, encode).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Image encoding exceeded {}s", timeout.as_secs());
            Err(AlertError::ImageTimeout {
                secs: timeout.as_secs(),
            })
        }
    }
}

async fn encode_unbounded(source: ImageSource) -> Result<EncodedImage, AlertError> {
    let (bytes, declared_mime, path) = match source {
        ImageSource::Path(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| AlertError::ImageRead {
                    path: path.clone(),
                    source: e,
                })?;
            (bytes, None, Some(path))
        }
        ImageSource::Bytes { bytes, mime_type } => (bytes, mime_type, None),
    };

    if bytes.is_empty() {
        return Err(AlertError::ImageEmpty);
    }

    tokio::task::spawn_blocking(move || {
        let mime_type = declared_mime.unwrap_or_else(|| sniff_mime(&bytes, path.as_deref()));
        encode_bytes(&bytes, mime_type)
    })
    .await
    .map_err(|e| AlertError::ImageTaskFailed(e.to_string()))
}

/// Base64-encode `bytes` under the given MIME type.
pub fn encode_bytes(bytes: &[u8], mime_type: String) -> EncodedImage {
    let data = STANDARD.encode(bytes);
    debug!("Encoded {} → {} bytes base64", mime_type, data.len());
    EncodedImage { mime_type, data }
}

/// MIME type from magic bytes, then file extension, then a generic fallback.
fn sniff_mime(bytes: &[u8], path: Option<&std::path::Path>) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    if let Some(format) = path.and_then(|p| ImageFormat::from_path(p).ok()) {
        return format.to_mime_type().to_string();
    }
    warn!("Attachment is not a recognised image; embedding as {FALLBACK_MIME}");
    FALLBACK_MIME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encode");
        buf
    }

    #[test]
    fn test_sniff_png() {
        assert_eq!(sniff_mime(&png_bytes(), None), "image/png");
    }

    #[test]
    fn test_sniff_falls_back_to_extension() {
        let path = std::path::Path::new("photo.jpg");
        assert_eq!(sniff_mime(b"not really a jpeg", Some(path)), "image/jpeg");
    }

    #[test]
    fn test_sniff_unknown() {
        assert_eq!(sniff_mime(b"plain text", None), FALLBACK_MIME);
    }

    #[tokio::test]
    async fn test_encode_in_memory_png() {
        let bytes = png_bytes();
        let img = encode_image(ImageSource::bytes(bytes.clone()), Duration::from_secs(5))
            .await
            .expect("encode should succeed");
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&img.data).expect("valid base64"), bytes);
        assert!(img.data_uri().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_declared_mime_wins() {
        let source = ImageSource::Bytes {
            bytes: png_bytes(),
            mime_type: Some("image/x-custom".into()),
        };
        let img = encode_image(source, Duration::from_secs(5)).await.unwrap();
        assert_eq!(img.mime_type, "image/x-custom");
    }

    #[tokio::test]
    async fn test_stalled_encode_times_out() {
        let stalled = std::future::pending::<Result<EncodedImage, AlertError>>();
        let err = bounded(stalled, Duration::from_millis(5)).await.unwrap_err();
        assert!(matches!(err, AlertError::ImageTimeout { .. }));
    }

    #[tokio::test]
    async fn test_finished_encode_within_bound() {
        let done = async { Ok(encode_bytes(&png_bytes(), "image/png".to_string())) };
        let img = bounded(done, Duration::from_secs(5)).await.unwrap();
        assert_eq!(img.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_empty_image_rejected() {
        let err = encode_image(ImageSource::bytes(Vec::new()), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AlertError::ImageEmpty));
    }

    #[tokio::test]
    async fn test_missing_file_reported() {
        let err = encode_image(
            ImageSource::path("/definitely/not/here.png"),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AlertError::ImageRead { .. }));
    }
}
