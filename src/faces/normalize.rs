use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, ImageEncoder};

use crate::error::ApiError;

/// Neither output dimension exceeds this; aspect ratio is preserved and
/// images are never upscaled.
pub const MAX_DIMENSION: u32 = 800;
pub const JPEG_QUALITY: u8 = 80;

/// An image re-encoded to bounded dimensions and baseline JPEG, ready for
/// the detection provider. Dimensions ride along so detectors can convert
/// pixel boxes into fractions.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

pub fn normalize(input: &[u8]) -> Result<NormalizedImage, ApiError> {
    let decoded = image::load_from_memory(input).map_err(|_| ApiError::UnsupportedImage)?;

    let resized = if decoded.width() > MAX_DIMENSION || decoded.height() > MAX_DIMENSION {
        decoded.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
    } else {
        decoded
    };

    // JPEG has no alpha channel; flatten before encoding.
    let rgb = resized.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .write_image(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| anyhow::anyhow!("jpeg encode: {e}"))?;

    Ok(NormalizedImage {
        bytes: Bytes::from(buf),
        width,
        height,
    })
}
