// SPDX-License-Identifier: GPL-3.0-only

//! Frame rasterization
//!
//! Renders a live camera frame into an off-screen RGB raster of the fixed output
//! size. The whole source frame is scaled into the raster (never cropped), so a
//! 1280x720 frame captured at 640x640 is squeezed horizontally like a canvas
//! `drawImage` with explicit source and destination rectangles.

use crate::backends::camera::format_converters::{packed_422_to_rgb, rgb24_compact, rgba_to_rgb};
use crate::backends::camera::types::{CameraFrame, PixelFormat};
use crate::errors::CaptureError;
use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};
use tracing::debug;

/// Convert a frame to RGB at its native resolution
pub fn frame_to_rgb(frame: &CameraFrame) -> Result<RgbImage, CaptureError> {
    if frame.data.is_empty() {
        return Err(CaptureError::NoFrameAvailable);
    }

    if frame.format == PixelFormat::MJPEG {
        let decoded = image::load_from_memory_with_format(&frame.data, ImageFormat::Jpeg)
            .map_err(|e| CaptureError::UnsupportedFormat(format!("MJPEG decode failed: {}", e)))?;
        return Ok(decoded.to_rgb8());
    }

    let rgb = match frame.format {
        PixelFormat::RGBA => rgba_to_rgb(&frame.data, frame.width, frame.height, frame.stride),
        PixelFormat::RGB24 => rgb24_compact(&frame.data, frame.width, frame.height, frame.stride),
        PixelFormat::YUYV => {
            packed_422_to_rgb(&frame.data, frame.width, frame.height, frame.stride, false)
        }
        PixelFormat::UYVY => {
            packed_422_to_rgb(&frame.data, frame.width, frame.height, frame.stride, true)
        }
        PixelFormat::MJPEG => None,
    }
    .ok_or_else(|| {
        CaptureError::UnsupportedFormat(format!(
            "{:?} frame of {} bytes does not fit {}x{}",
            frame.format,
            frame.data.len(),
            frame.width,
            frame.height
        ))
    })?;

    RgbImage::from_raw(frame.width, frame.height, rgb).ok_or_else(|| {
        CaptureError::ContextUnavailable("frame buffer size mismatch".to_string())
    })
}

/// Render `frame` into a `width` x `height` raster
pub fn rasterize(frame: &CameraFrame, width: u32, height: u32) -> Result<RgbImage, CaptureError> {
    if width == 0 || height == 0 {
        return Err(CaptureError::ContextUnavailable(format!(
            "invalid output size {}x{}",
            width, height
        )));
    }

    let source = frame_to_rgb(frame)?;
    if source.dimensions() == (width, height) {
        return Ok(source);
    }

    debug!(
        from = %format!("{}x{}", source.width(), source.height()),
        to = %format!("{}x{}", width, height),
        "Scaling frame into capture raster"
    );
    Ok(image::imageops::resize(&source, width, height, FilterType::Triangle))
}
