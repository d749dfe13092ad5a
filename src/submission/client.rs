// SPDX-License-Identifier: GPL-3.0-only

//! HTTP face-swap client
//!
//! Sends one multipart request per submission and folds every failure path
//! (transport, status, body, logical flag) into [`SubmissionResult::Failure`].

use super::Submitter;
use super::types::*;
use crate::config::ApiConfig;
use crate::constants::{HEALTH_CHECK_TIMEOUT, IMAGE_FIELD, IMAGE_FILENAME, messages};
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Face-swap backend client
#[derive(Debug, Clone)]
pub struct SubmissionClient {
    client: reqwest::Client,
    swap_url: String,
    health_url: String,
    request_timeout: Duration,
}

impl SubmissionClient {
    /// Create a client for the configured backend
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            swap_url: config.swap_url(),
            health_url: config.health_url(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn swap_url(&self) -> &str {
        &self.swap_url
    }

    fn build_form(request: &SubmissionRequest) -> Result<Form, reqwest::Error> {
        let part = Part::bytes(request.artifact.payload().to_vec())
            .file_name(IMAGE_FILENAME)
            .mime_str(request.artifact.mime())?;

        Ok(Form::new()
            .part(IMAGE_FIELD, part)
            .text("source_face_id", request.source_face_id.to_string())
            .text("destination_face_id", request.destination_face_id.to_string()))
    }

    /// Single attempt, no retries
    pub async fn submit_request(&self, request: SubmissionRequest) -> SubmissionResult {
        let form = match Self::build_form(&request) {
            Ok(form) => form,
            Err(e) => return network_failure(e),
        };

        info!(
            url = %self.swap_url,
            bytes = request.artifact.payload().len(),
            source_face_id = request.source_face_id,
            destination_face_id = request.destination_face_id,
            "Submitting photo for face swap"
        );

        let response = match self
            .client
            .post(&self.swap_url)
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return network_failure(e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return network_failure(e),
        };

        let result = interpret_response(status, &body);
        match &result {
            SubmissionResult::Success(success) => info!(
                status = status.as_u16(),
                images = success.images.len(),
                faces = success.faces_detected_in_source,
                "Face swap succeeded"
            ),
            SubmissionResult::Failure(failure) => warn!(
                status = status.as_u16(),
                message = %failure.message,
                "Face swap failed"
            ),
        }
        result
    }

    /// Best-effort liveness probe; never fails
    pub async fn health(&self) -> bool {
        match self
            .client
            .get(&self.health_url)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => {
                debug!(status = response.status().as_u16(), "Health check response");
                response.status().is_success()
            }
            Err(e) => {
                debug!(error = %e, "Health check failed");
                false
            }
        }
    }
}

impl Submitter for SubmissionClient {
    fn submit(&self, request: SubmissionRequest) -> BoxFuture<'_, SubmissionResult> {
        self.submit_request(request).boxed()
    }

    fn check_health(&self) -> BoxFuture<'_, bool> {
        self.health().boxed()
    }
}

fn network_failure(err: reqwest::Error) -> SubmissionResult {
    warn!(error = %err, "Face swap request failed");
    SubmissionResult::Failure(
        SubmissionFailure::new(messages::NETWORK_ERROR).with_detail(err.to_string()),
    )
}

/// Map a status and body to a submission outcome
pub fn interpret_response(status: StatusCode, body: &str) -> SubmissionResult {
    if !status.is_success() {
        let failure = match serde_json::from_str::<ErrorResponse>(body) {
            Ok(parsed) if !parsed.error.is_empty() => SubmissionFailure {
                message: parsed.error,
                detail: parsed.detail,
            },
            Ok(parsed) => SubmissionFailure {
                message: format!("Server error: {}", status.as_u16()),
                detail: parsed.detail,
            },
            Err(_) => SubmissionFailure::new(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status")
            )),
        };
        return SubmissionResult::Failure(failure);
    }

    match serde_json::from_str::<FaceSwapResponse>(body) {
        Ok(parsed) if parsed.success => SubmissionResult::Success(parsed.into()),
        Ok(parsed) => {
            let message = if parsed.message.is_empty() {
                messages::FACE_SWAP_FAILED.to_string()
            } else {
                parsed.message
            };
            SubmissionResult::Failure(SubmissionFailure::new(message))
        }
        Err(e) => SubmissionResult::Failure(
            SubmissionFailure::new(messages::FACE_SWAP_FAILED)
                .with_detail(format!("Invalid response body: {}", e)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(result: SubmissionResult) -> SubmissionFailure {
        match result {
            SubmissionResult::Failure(failure) => failure,
            SubmissionResult::Success(s) => panic!("expected failure, got {:?}", s),
        }
    }

    #[test]
    fn test_logical_failure_uses_message() {
        let result = interpret_response(
            StatusCode::OK,
            r#"{"success": false, "message": "no face found"}"#,
        );
        assert_eq!(failure(result).message, "no face found");
    }

    #[test]
    fn test_logical_failure_without_message() {
        let result = interpret_response(StatusCode::OK, r#"{"success": false}"#);
        assert_eq!(failure(result).message, messages::FACE_SWAP_FAILED);
    }

    #[test]
    fn test_unparsable_error_body() {
        let result = interpret_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(failure(result).message, "HTTP 500: Internal Server Error");
    }

    #[test]
    fn test_structured_error_body() {
        let result = interpret_response(
            StatusCode::BAD_REQUEST,
            r#"{"success": false, "error": "No face detected", "detail": "source"}"#,
        );
        let failure = failure(result);
        assert_eq!(failure.message, "No face detected");
        assert_eq!(failure.detail.as_deref(), Some("source"));
    }

    #[test]
    fn test_error_body_without_error_field() {
        let result = interpret_response(StatusCode::BAD_GATEWAY, r#"{"detail": "upstream"}"#);
        assert_eq!(failure(result).message, "Server error: 502");
    }

    #[test]
    fn test_invalid_success_body() {
        let result = interpret_response(StatusCode::OK, "not json");
        let failure = failure(result);
        assert_eq!(failure.message, messages::FACE_SWAP_FAILED);
        assert!(failure.detail.is_some());
    }

    #[test]
    fn test_success_keeps_image_order() {
        let body = r#"{
            "success": true,
            "message": "Swapped 2 faces",
            "swapped_images": [
                {"image_data": "QQ==", "destination_name": "first"},
                {"image_data": "Qg==", "destination_name": "second"}
            ],
            "faces_detected_in_source": 1
        }"#;
        match interpret_response(StatusCode::OK, body) {
            SubmissionResult::Success(success) => {
                let names: Vec<_> = success
                    .images
                    .iter()
                    .map(|i| i.destination_name.as_str())
                    .collect();
                assert_eq!(names, ["first", "second"]);
                assert_eq!(success.faces_detected_in_source, 1);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }
}
