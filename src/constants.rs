// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Default face-swap backend base URL
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Path suffix of the face-swap endpoint (appended to the base URL)
pub const SWAP_ENDPOINT: &str = "/api/v1/swap";

/// Path suffix of the liveness endpoint (appended to the base URL)
pub const HEALTH_ENDPOINT: &str = "/api/v1/health";

/// Ideal acquisition resolution requested from the camera
pub const DEFAULT_PREVIEW_WIDTH: u32 = 1024;
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 1024;

/// Fixed output resolution of a captured photo
pub const DEFAULT_RESIZE_WIDTH: u32 = 640;
pub const DEFAULT_RESIZE_HEIGHT: u32 = 640;

/// JPEG compression quality in `[0, 1]`
pub const DEFAULT_QUALITY: f32 = 0.8;

/// Timeout for a single face-swap submission
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for the liveness probe
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Face identifier used when none is specified
pub const DEFAULT_FACE_ID: u32 = 1;

/// Multipart field and file names of the uploaded photo
pub const IMAGE_FIELD: &str = "image";
pub const IMAGE_FILENAME: &str = "captured-photo.jpg";
pub const IMAGE_MIME: &str = "image/jpeg";

/// Folder (under the user's pictures directory) for saved photos and results
pub const DEFAULT_SAVE_FOLDER: &str = "FaceSwap";

/// Number of mmap buffers queued on a V4L2 capture stream
pub const V4L2_BUFFER_COUNT: u32 = 4;

/// Longest a V4L2 dequeue waits before the capture loop checks for a stop request
pub const V4L2_POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// User-facing messages
pub mod messages {
    pub const CAMERA_NOT_SUPPORTED: &str = "Camera is not supported by this browser";
    pub const CAMERA_ACCESS_FAILED: &str = "Failed to access camera";
    pub const CAPTURE_FAILED: &str = "Failed to capture photo";
    pub const FACE_SWAP_FAILED: &str = "Face swap failed";
    pub const REQUEST_CANCELLED: &str = "The request was cancelled before it completed";
    pub const NETWORK_ERROR: &str = "Network error occurred while processing your photo";
}
