// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! This module provides the capabilities probe and media acquisition behind a
//! trait so the session state machine never talks to a device directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Session controller │
//! └──────────┬──────────┘
//!            │ is_supported() / acquire()
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌──────────┐
//!   │ V4L2 │  │File image│
//!   └──────┘  └──────────┘
//! ```
//!
//! A successful acquisition yields a [`CameraHandle`]. The handle owns the live
//! stream and stops it when released or dropped, so every exit path frees the device.

pub mod file_source;
pub mod format_converters;
pub mod types;
pub mod v4l2;

pub use types::*;

use futures::future::BoxFuture;
use std::path::PathBuf;
use tracing::{debug, warn};

/// An open media stream
pub trait LiveStream: Send {
    /// Most recent frame delivered by the device, if any
    fn latest_frame(&self) -> Option<CameraFrame>;

    /// Stop every track of the stream and release the device
    fn stop(&mut self);
}

/// Owned reference to an open camera stream
///
/// Exactly one session owns a handle. Releasing is idempotent, and dropping an
/// unreleased handle releases it.
pub struct CameraHandle {
    label: String,
    stream: Option<Box<dyn LiveStream>>,
}

impl CameraHandle {
    pub fn new(label: impl Into<String>, stream: Box<dyn LiveStream>) -> Self {
        Self {
            label: label.into(),
            stream: Some(stream),
        }
    }

    /// Human-readable source name (device path or file name)
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the stream is still running
    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }

    /// Latest frame of a live stream
    pub fn latest_frame(&self) -> Option<CameraFrame> {
        self.stream.as_ref().and_then(|s| s.latest_frame())
    }

    /// Stop all tracks. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            debug!(source = %self.label, "Releasing camera stream");
            stream.stop();
        }
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CameraHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraHandle")
            .field("label", &self.label)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Release a possibly-absent handle and clear the slot.
///
/// No-op for an empty slot or an already released handle.
pub fn release(handle: &mut Option<CameraHandle>) {
    if let Some(mut handle) = handle.take() {
        handle.release();
    }
}

/// Release a handle on the blocking pool.
///
/// Stopping a device stream joins its capture thread; async callers use this so the
/// join never runs on a runtime worker. The release completes even if the caller is
/// cancelled while waiting.
pub async fn release_blocking(handle: Option<CameraHandle>) {
    let Some(mut handle) = handle else {
        return;
    };
    if let Err(e) = tokio::task::spawn_blocking(move || handle.release()).await {
        warn!(error = %e, "Camera release task failed");
    }
}

/// Camera backend trait
///
/// Backends provide:
/// - A synchronous, side-effect free capability probe
/// - Asynchronous stream acquisition under explicit constraints
pub trait CameraBackend: Send + Sync {
    /// Check whether this runtime can acquire a camera stream at all.
    ///
    /// A positive answer does not guarantee acquisition will succeed
    /// (permissions may still be denied).
    fn is_supported(&self) -> bool;

    /// Open a live stream matching `constraints` as closely as possible
    ///
    /// # Returns
    /// * `Ok(CameraHandle)` - Stream is running
    /// * `Err(BackendError)` - Permission denied, no device, unsupported format...
    fn acquire(&self, constraints: StreamConstraints) -> BoxFuture<'_, BackendResult<CameraHandle>>;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;
}

/// Get a concrete backend: a still-image source when `source` is given, V4L2 otherwise
pub fn get_backend(device: Option<String>, source: Option<PathBuf>) -> Box<dyn CameraBackend> {
    match source {
        Some(path) => Box::new(file_source::FileSourceBackend::new(path)),
        None => Box::new(v4l2::V4l2Backend::new(device)),
    }
}
