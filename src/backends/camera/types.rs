// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Video4Linux2 capture device
    #[default]
    V4l2,
    /// Still image served as a live source
    File,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::File => write!(f, "file"),
        }
    }
}

/// Which way the camera faces relative to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FacingMode {
    /// Front-facing ("selfie") camera
    #[default]
    User,
    /// Rear camera
    Environment,
}

/// Constraints passed to [`super::CameraBackend::acquire`]
///
/// Width and height are ideals: the backend picks the closest mode the device offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
}

impl StreamConstraints {
    /// Front-facing video at the given ideal resolution
    pub fn front_facing(ideal_width: u32, ideal_height: u32) -> Self {
        Self {
            ideal_width,
            ideal_height,
            facing: FacingMode::User,
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Card name reported by the driver
    pub name: String,
    /// Device node (e.g. `/dev/video0`)
    pub path: String,
    /// Driver name (e.g. `uvcvideo`)
    pub driver: String,
    /// Bus the device is attached to
    pub bus_info: String,
    /// Camera location when the platform reports one ("front", "back", "external")
    pub location: Option<String>,
}

impl CameraDevice {
    /// Whether the device looks like a user-facing camera
    pub fn is_front_facing(&self) -> bool {
        match self.location.as_deref() {
            Some(location) => location == "front" || location == "external",
            None => {
                let name = self.name.to_lowercase();
                !name.contains("back") && !name.contains("rear")
            }
        }
    }
}

/// Pixel layout of a [`CameraFrame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 32-bit RGBA (4 bytes per pixel)
    RGBA,
    /// 24-bit RGB (3 bytes per pixel)
    RGB24,
    /// Packed 4:2:2 (Y0 U Y1 V)
    YUYV,
    /// Packed 4:2:2 (U Y0 V Y1)
    UYVY,
    /// Motion-JPEG: each buffer is a complete JPEG image
    MJPEG,
}

impl PixelFormat {
    /// V4L2 FourCC code for this format
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            Self::RGBA => *b"AB24",
            Self::RGB24 => *b"RGB3",
            Self::YUYV => *b"YUYV",
            Self::UYVY => *b"UYVY",
            Self::MJPEG => *b"MJPG",
        }
    }

    /// Parse a V4L2 FourCC code
    pub fn from_fourcc(code: &[u8; 4]) -> Option<Self> {
        match code {
            b"AB24" => Some(Self::RGBA),
            b"RGB3" => Some(Self::RGB24),
            b"YUYV" => Some(Self::YUYV),
            b"UYVY" => Some(Self::UYVY),
            b"MJPG" => Some(Self::MJPEG),
            _ => None,
        }
    }

    /// Bytes per pixel for uncompressed formats
    pub fn bytes_per_pixel(&self) -> Option<u32> {
        match self {
            Self::RGBA => Some(4),
            Self::RGB24 => Some(3),
            Self::YUYV | Self::UYVY => Some(2),
            Self::MJPEG => None,
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Raw frame bytes in `format`
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride in bytes (0 for compressed formats)
    pub stride: u32,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap a tightly packed RGBA buffer
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Camera acquisition failures
///
/// Display is the underlying platform message so it can be shown to the user unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The user or the system refused camera access
    #[error("{0}")]
    AccessDenied(String),
    /// No usable camera device
    #[error("{0}")]
    DeviceNotFound(String),
    /// The device cannot deliver any format we can decode
    #[error("Format not supported: {0}")]
    FormatNotSupported(String),
    /// General I/O error
    #[error("{0}")]
    Io(String),
    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => BackendError::AccessDenied(err.to_string()),
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(err.to_string()),
            _ => BackendError::Io(err.to_string()),
        }
    }
}
