// SPDX-License-Identifier: GPL-3.0-only

//! Submission request/result types and backend wire shapes

use crate::constants::DEFAULT_FACE_ID;
use crate::pipelines::photo::CapturedArtifact;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One face-swap request
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub artifact: Arc<CapturedArtifact>,
    pub source_face_id: u32,
    pub destination_face_id: u32,
}

impl SubmissionRequest {
    /// Request with both face identifiers at their default
    pub fn new(artifact: Arc<CapturedArtifact>) -> Self {
        Self {
            artifact,
            source_face_id: DEFAULT_FACE_ID,
            destination_face_id: DEFAULT_FACE_ID,
        }
    }

    pub fn with_faces(mut self, source_face_id: u32, destination_face_id: u32) -> Self {
        self.source_face_id = source_face_id;
        self.destination_face_id = destination_face_id;
        self
    }
}

/// A swapped image returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwappedImage {
    /// Base64 encoded image
    #[serde(default)]
    pub image_data: String,
    #[serde(default)]
    pub destination_name: String,
}

impl SwappedImage {
    /// Decode the image bytes. Tolerates a `data:` URL prefix.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let encoded = match self.image_data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.image_data.as_str(),
        };
        STANDARD.decode(encoded.trim())
    }
}

/// Body of a 2xx swap response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceSwapResponse {
    pub success: bool,
    pub message: String,
    pub swapped_images: Vec<SwappedImage>,
    pub faces_detected_in_source: u32,
}

/// Body of a non-2xx response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Successful swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapSuccess {
    pub message: String,
    /// In the order returned by the backend
    pub images: Vec<SwappedImage>,
    pub faces_detected_in_source: u32,
}

/// Any failed submission: network, status, body or logical failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFailure {
    pub message: String,
    pub detail: Option<String>,
}

impl SubmissionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Outcome of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    Success(SwapSuccess),
    Failure(SubmissionFailure),
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionResult::Success(_))
    }

    /// Human-readable message of either outcome
    pub fn message(&self) -> &str {
        match self {
            SubmissionResult::Success(success) => &success.message,
            SubmissionResult::Failure(failure) => &failure.message,
        }
    }
}

impl From<FaceSwapResponse> for SwapSuccess {
    fn from(response: FaceSwapResponse) -> Self {
        Self {
            message: response.message,
            images: response.swapped_images,
            faces_detected_in_source: response.faces_detected_in_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_response_defaults_missing_fields() {
        let response: FaceSwapResponse =
            serde_json::from_str(r#"{"success": false, "message": "no face found"}"#).unwrap();
        assert!(!response.success);
        assert_eq!(response.message, "no face found");
        assert!(response.swapped_images.is_empty());
    }

    #[test]
    fn test_error_response_detail_optional() {
        let response: ErrorResponse =
            serde_json::from_str(r#"{"success": false, "error": "bad image"}"#).unwrap();
        assert_eq!(response.error, "bad image");
        assert_eq!(response.detail, None);
    }

    #[test]
    fn test_swapped_image_decode() {
        let image = SwappedImage {
            image_data: STANDARD.encode(b"jpeg"),
            destination_name: "poster".to_string(),
        };
        assert_eq!(image.decode().unwrap(), b"jpeg");

        let with_prefix = SwappedImage {
            image_data: format!("data:image/jpeg;base64,{}", STANDARD.encode(b"png?")),
            destination_name: String::new(),
        };
        assert_eq!(with_prefix.decode().unwrap(), b"png?");
    }
}
