// SPDX-License-Identifier: GPL-3.0-only

//! Capture pipelines
//!
//! - [`photo`]: snapshot a live frame, resize it to the output size and encode it

pub mod photo;

pub use photo::{CapturePipeline, CaptureSettings, CapturedArtifact, FrameSource};
