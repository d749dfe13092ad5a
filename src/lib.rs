// SPDX-License-Identifier: GPL-3.0-only

//! FaceSwap Camera - capture a photo from a local camera and swap faces with a remote service
//!
//! This library provides the capture session that drives a camera from acquisition
//! to a face-swap result, together with the pieces it is built from.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`session`]: The capture session state machine
//! - [`backends`]: Capability probe and camera acquisition (V4L2, still image)
//! - [`pipelines`]: Frame capture, resize and JPEG encoding
//! - [`submission`]: HTTP client for the face-swap backend
//! - [`config`]: Environment configuration
//! - [`storage`]: Saving photos and results
//! - [`terminal`]: Terminal front-end
//!
//! # Example
//!
//! ```ignore
//! let config = Config::from_env();
//! let backend = get_backend(config.camera.device.clone(), None);
//! let client = SubmissionClient::new(&config.api)?;
//! let session = SessionController::new(Arc::from(backend), Arc::new(client), &config.camera);
//!
//! session.start().await;
//! session.capture().await;
//! session.submit().await;
//! println!("{:?}", session.snapshot().phase);
//! session.teardown();
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod session;
pub mod storage;
pub mod submission;
pub mod terminal;

// Re-export commonly used types
pub use backends::camera::{CameraBackend, CameraHandle, get_backend};
pub use config::Config;
pub use errors::{AppError, AppResult, SessionError};
pub use pipelines::photo::{CapturePipeline, CapturedArtifact};
pub use session::{Phase, SessionController, SessionSnapshot, Transition};
pub use submission::{SubmissionClient, SubmissionResult, Submitter};
