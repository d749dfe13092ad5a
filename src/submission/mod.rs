// SPDX-License-Identifier: GPL-3.0-only

//! Submission of captured photos to the face-swap backend

pub mod client;
pub mod types;

pub use client::SubmissionClient;
pub use types::*;

use futures::future::BoxFuture;

/// Something that can swap faces in a captured photo
///
/// Implementations must never fail outside of [`SubmissionResult::Failure`].
pub trait Submitter: Send + Sync {
    /// One request/response exchange
    fn submit(&self, request: SubmissionRequest) -> BoxFuture<'_, SubmissionResult>;

    /// Best-effort liveness probe
    fn check_health(&self) -> BoxFuture<'_, bool>;
}
