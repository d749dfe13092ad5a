// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture session
//!
//! Component-level failures ([`BackendError`], [`CaptureError`] and submission
//! failures) are converted into a [`SessionError`] at the state machine boundary.
//! The session never lets one of them escape; it moves into the error phase instead.

use crate::backends::camera::BackendError;
use crate::constants::messages;
use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Frame capture and resize failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The live source has not produced a frame yet
    #[error("No frame available for capture")]
    NoFrameAvailable,
    /// The off-screen raster could not be created
    #[error("Unable to create capture raster: {0}")]
    ContextUnavailable(String),
    /// The frame's pixel data could not be interpreted
    #[error("Unsupported frame format: {0}")]
    UnsupportedFormat(String),
    /// Encoding finished without producing any bytes
    #[error("Failed to create image blob")]
    EmptyPayload,
    /// The encoder rejected the raster
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
    /// The background encode task did not complete
    #[error("Capture task failed: {0}")]
    TaskFailed(String),
    /// The capture was abandoned after the camera had been released
    #[error("{}", messages::CAPTURE_FAILED)]
    Interrupted,
}

/// How the user can recover from an error phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Re-run the capability check and camera acquisition
    TryAgain,
    /// Submit the retained photo again (or retake it)
    Resubmit,
}

/// Failure that put the session into its error phase
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The capability probe found no way to acquire a camera
    #[error("{}", messages::CAMERA_NOT_SUPPORTED)]
    UnsupportedPlatform,
    /// Camera permission or device failure
    #[error("{0}")]
    Acquisition(String),
    /// Raster or encoding failure
    #[error("{0}")]
    Capture(#[from] CaptureError),
    /// Network, status, body or logical failure of a submission
    #[error("{message}")]
    Submission {
        message: String,
        detail: Option<String>,
    },
}

impl SessionError {
    /// Build an acquisition error from the backend failure.
    ///
    /// The platform message is used as-is; a blank message falls back to a generic one.
    pub fn acquisition(err: &BackendError) -> Self {
        let message = err.to_string();
        if message.trim().is_empty() {
            SessionError::Acquisition(messages::CAMERA_ACCESS_FAILED.to_string())
        } else {
            SessionError::Acquisition(message)
        }
    }

    /// Recovery offered alongside this error
    pub fn recovery(&self) -> RecoveryAction {
        match self {
            SessionError::UnsupportedPlatform
            | SessionError::Acquisition(_)
            | SessionError::Capture(_) => RecoveryAction::TryAgain,
            SessionError::Submission { .. } => RecoveryAction::Resubmit,
        }
    }

    /// Optional extra detail (submission failures only)
    pub fn detail(&self) -> Option<&str> {
        match self {
            SessionError::Submission { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// Top-level error for the binary and storage helpers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Camera error: {0}")]
    Camera(#[from] BackendError),
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid image data: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}
