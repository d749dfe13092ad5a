// SPDX-License-Identifier: GPL-3.0-only

//! Still image camera source
//!
//! Serves a single decoded image file as if it were a live camera. Useful on
//! machines without a webcam and for scripted runs of the capture flow.

use super::types::*;
use super::{CameraBackend, CameraHandle, LiveStream};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::PathBuf;
use tracing::{debug, info};

/// Backend that "acquires" an image file
pub struct FileSourceBackend {
    path: PathBuf,
}

impl FileSourceBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CameraBackend for FileSourceBackend {
    fn is_supported(&self) -> bool {
        self.path.is_file()
    }

    fn acquire(
        &self,
        constraints: StreamConstraints,
    ) -> BoxFuture<'_, BackendResult<CameraHandle>> {
        async move {
            let path = self.path.clone();
            debug!(
                path = %path.display(),
                ideal_width = constraints.ideal_width,
                ideal_height = constraints.ideal_height,
                "Opening still image source"
            );

            // Decode in background task (CPU-bound)
            let frame = tokio::task::spawn_blocking(move || load_frame(&path))
                .await
                .map_err(|e| BackendError::Other(format!("Image loading task failed: {}", e)))??;

            info!(
                path = %self.path.display(),
                width = frame.width,
                height = frame.height,
                "Still image source ready"
            );

            let label = self.path.display().to_string();
            Ok(CameraHandle::new(label, Box::new(StillStream { frame: Some(frame) })))
        }
        .boxed()
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::File
    }
}

fn load_frame(path: &std::path::Path) -> BackendResult<CameraFrame> {
    let bytes = std::fs::read(path)?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| BackendError::FormatNotSupported(format!("{}: {}", path.display(), e)))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(CameraFrame::from_rgba(width, height, rgba.into_raw()))
}

/// Live stream that keeps returning the same frame until stopped
struct StillStream {
    frame: Option<CameraFrame>,
}

impl LiveStream for StillStream {
    fn latest_frame(&self) -> Option<CameraFrame> {
        self.frame.clone()
    }

    fn stop(&mut self) {
        self.frame = None;
    }
}
