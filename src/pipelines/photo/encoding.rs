// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding
//!
//! The capture raster is encoded once as JPEG. The transport payload is those
//! bytes; the display form is a `data:` URL wrapping the very same bytes, so both
//! outputs decode to identical pixels.

use crate::constants::IMAGE_MIME;
use crate::errors::CaptureError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbImage;
use tracing::debug;

/// Map a `[0, 1]` quality to the JPEG encoder's `1..=100` scale
pub fn jpeg_quality(quality: f32) -> u8 {
    if !quality.is_finite() {
        return 80;
    }
    ((quality.clamp(0.0, 1.0) * 100.0).round() as u8).max(1)
}

/// Encode image as JPEG
pub fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<Vec<u8>, CaptureError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, jpeg_quality(quality));

    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| CaptureError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

    if buffer.is_empty() {
        return Err(CaptureError::EmptyPayload);
    }

    debug!(size = buffer.len(), "Encoding complete");
    Ok(buffer)
}

/// Wrap encoded JPEG bytes in a displayable `data:` URL
pub fn to_data_url(jpeg: &[u8]) -> String {
    format!("data:{};base64,{}", IMAGE_MIME, STANDARD.encode(jpeg))
}

/// Extract the bytes of a base64 `data:` URL
pub fn from_data_url(url: &str) -> Option<Vec<u8>> {
    let (_, encoded) = url.strip_prefix("data:")?.split_once(";base64,")?;
    STANDARD.decode(encoded).ok()
}
