// SPDX-License-Identifier: GPL-3.0-only

//! Async photo capture pipeline
//!
//! ```text
//! Live source → Snapshot → Rasterize (fixed size) → JPEG encode → Artifact
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Snapshot**: take the latest frame from the live source (cheap `Arc` clone)
//! 2. **Rasterize**: convert to RGB and scale into the configured output size
//! 3. **Encoding**: JPEG at the configured quality, plus a `data:` URL for display
//!
//! Stages 2 and 3 run on the blocking pool so the caller only suspends.
//! Every call produces a fresh artifact; nothing is cached between captures.

pub mod capture;
pub mod encoding;

use crate::backends::camera::CameraHandle;
use crate::backends::camera::types::CameraFrame;
use crate::config::CameraConfig;
use crate::constants::IMAGE_MIME;
use crate::errors::CaptureError;
use chrono::{DateTime, Local};
use image::RgbImage;
use std::sync::Arc;
use tracing::info;

/// Anything that can hand out the current frame of a live stream
pub trait FrameSource {
    fn current_frame(&self) -> Option<CameraFrame>;
}

impl FrameSource for CameraHandle {
    fn current_frame(&self) -> Option<CameraFrame> {
        self.latest_frame()
    }
}

impl FrameSource for CameraFrame {
    fn current_frame(&self) -> Option<CameraFrame> {
        Some(self.clone())
    }
}

/// Output size and compression of a capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    /// JPEG quality in `[0, 1]`
    pub quality: f32,
}

impl From<&CameraConfig> for CaptureSettings {
    fn from(config: &CameraConfig) -> Self {
        Self {
            width: config.resize_width,
            height: config.resize_height,
            quality: config.quality,
        }
    }
}

/// A captured, resized photo
///
/// Immutable once produced. Cloning shares the encoded bytes.
#[derive(Debug, Clone)]
pub struct CapturedArtifact {
    width: u32,
    height: u32,
    payload: Arc<[u8]>,
    display_url: Arc<str>,
    captured_at: DateTime<Local>,
}

impl CapturedArtifact {
    fn new(width: u32, height: u32, jpeg: Vec<u8>) -> Self {
        let display_url = encoding::to_data_url(&jpeg);
        Self {
            width,
            height,
            payload: Arc::from(jpeg),
            display_url: Arc::from(display_url),
            captured_at: Local::now(),
        }
    }

    /// Raster width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raster height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Encoded bytes sent to the backend
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Shared handle to the encoded bytes
    pub fn payload_arc(&self) -> Arc<[u8]> {
        Arc::clone(&self.payload)
    }

    /// `data:` URL for direct display
    pub fn display_url(&self) -> &str {
        &self.display_url
    }

    pub fn mime(&self) -> &'static str {
        IMAGE_MIME
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    /// Decode the payload back into pixels
    pub fn decode(&self) -> Result<RgbImage, CaptureError> {
        image::load_from_memory(&self.payload)
            .map(|img| img.to_rgb8())
            .map_err(|e| CaptureError::EncodingFailed(format!("payload does not decode: {}", e)))
    }
}

/// Frame capture and resize pipeline
#[derive(Debug, Clone)]
pub struct CapturePipeline {
    settings: CaptureSettings,
}

impl CapturePipeline {
    pub fn new(settings: CaptureSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> CaptureSettings {
        self.settings
    }

    /// Snapshot the live source and produce an artifact
    ///
    /// # Returns
    /// * `Ok(CapturedArtifact)` - Raster of exactly the configured size
    /// * `Err(CaptureError)` - No frame, unusable frame, or encoding failure
    pub async fn capture_and_resize<S>(&self, source: &S) -> Result<CapturedArtifact, CaptureError>
    where
        S: FrameSource + ?Sized,
    {
        let frame = source
            .current_frame()
            .ok_or(CaptureError::NoFrameAvailable)?;
        let settings = self.settings;

        info!(
            source_width = frame.width,
            source_height = frame.height,
            width = settings.width,
            height = settings.height,
            "Capturing photo"
        );

        // Run rasterization and encoding in background task (CPU-bound)
        tokio::task::spawn_blocking(move || Self::process(&frame, settings))
            .await
            .map_err(|e| CaptureError::TaskFailed(e.to_string()))?
    }

    /// Synchronous rasterize + encode
    pub fn process(
        frame: &CameraFrame,
        settings: CaptureSettings,
    ) -> Result<CapturedArtifact, CaptureError> {
        let raster = capture::rasterize(frame, settings.width, settings.height)?;
        let jpeg = encoding::encode_jpeg(&raster, settings.quality)?;
        Ok(CapturedArtifact::new(raster.width(), raster.height(), jpeg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> CameraFrame {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 128, 255]);
            }
        }
        CameraFrame::from_rgba(width, height, data)
    }

    fn settings() -> CaptureSettings {
        CaptureSettings {
            width: 640,
            height: 640,
            quality: 0.8,
        }
    }

    #[tokio::test]
    async fn test_capture_resizes_to_configured_output() {
        let pipeline = CapturePipeline::new(settings());
        let artifact = pipeline
            .capture_and_resize(&gradient_frame(1280, 720))
            .await
            .unwrap();

        assert_eq!((artifact.width(), artifact.height()), (640, 640));
        assert_eq!(artifact.decode().unwrap().dimensions(), (640, 640));
    }

    #[tokio::test]
    async fn test_display_and_payload_share_bytes() {
        let pipeline = CapturePipeline::new(settings());
        let artifact = pipeline
            .capture_and_resize(&gradient_frame(320, 240))
            .await
            .unwrap();

        let display_bytes = encoding::from_data_url(artifact.display_url()).unwrap();
        assert_eq!(display_bytes.as_slice(), artifact.payload());
    }

    #[tokio::test]
    async fn test_same_frame_same_output_fresh_artifact() {
        let pipeline = CapturePipeline::new(settings());
        let frame = gradient_frame(64, 48);
        let first = pipeline.capture_and_resize(&frame).await.unwrap();
        let second = pipeline.capture_and_resize(&frame).await.unwrap();

        assert_eq!(first.payload(), second.payload());
        assert!(!Arc::ptr_eq(&first.payload_arc(), &second.payload_arc()));
    }

    struct EmptySource;

    impl FrameSource for EmptySource {
        fn current_frame(&self) -> Option<CameraFrame> {
            None
        }
    }

    #[tokio::test]
    async fn test_no_frame_available() {
        let pipeline = CapturePipeline::new(settings());
        let err = pipeline.capture_and_resize(&EmptySource).await.unwrap_err();
        assert_eq!(err, CaptureError::NoFrameAvailable);
    }
}
