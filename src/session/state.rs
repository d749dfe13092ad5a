// SPDX-License-Identifier: GPL-3.0-only

//! Session phases and the state published to readers

use crate::backends::camera::CameraHandle;
use crate::errors::{RecoveryAction, SessionError};
use crate::pipelines::photo::CapturedArtifact;
use crate::submission::SubmissionResult;
use std::fmt;
use std::sync::Arc;

/// Discrete state of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    Initializing,
    Ready,
    Captured,
    Processing,
    Results,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Initializing => "initializing",
            Phase::Ready => "ready",
            Phase::Captured => "captured",
            Phase::Processing => "processing",
            Phase::Results => "results",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

/// Outcome of a session trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The trigger ran to completion and left the session in this phase
    Applied(Phase),
    /// Not valid in the current phase, another transition is in flight,
    /// or the session is torn down
    Ignored,
    /// The awaited result arrived for a superseded or torn-down session
    Discarded,
}

/// Read-only view of a session for rendering
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub error: Option<SessionError>,
    pub artifact: Option<Arc<CapturedArtifact>>,
    pub result: Option<SubmissionResult>,
    /// A camera stream is currently held
    pub camera_live: bool,
    /// A triggered transition has not settled yet
    pub busy: bool,
    pub torn_down: bool,
}

impl SessionSnapshot {
    /// Message to surface alongside the error phase
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    /// Recovery action offered in the error phase
    pub fn recovery(&self) -> Option<RecoveryAction> {
        self.error.as_ref().map(SessionError::recovery)
    }
}

/// Mutable session aggregate, owned by the controller
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub phase: Phase,
    pub error: Option<SessionError>,
    pub handle: Option<CameraHandle>,
    pub artifact: Option<Arc<CapturedArtifact>>,
    pub result: Option<SubmissionResult>,
    /// Bumped whenever in-flight work must be considered stale
    pub epoch: u64,
    pub in_flight: bool,
    pub torn_down: bool,
}

impl SessionState {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            error: self.error.clone(),
            artifact: self.artifact.clone(),
            result: self.result.clone(),
            camera_live: self.handle.as_ref().is_some_and(CameraHandle::is_live),
            busy: self.in_flight,
            torn_down: self.torn_down,
        }
    }

    /// Drop the artifact, result and error
    pub fn reset_outputs(&mut self) {
        self.artifact = None;
        self.result = None;
        self.error = None;
    }

    pub fn is_stale(&self, ticket: u64) -> bool {
        self.torn_down || self.epoch != ticket
    }

    /// The error phase offers try-again
    pub fn can_try_again(&self) -> bool {
        self.phase == Phase::Error
            && self
                .error
                .as_ref()
                .is_some_and(|e| e.recovery() == RecoveryAction::TryAgain)
    }

    /// The error phase came from a submission and the photo is still held
    pub fn can_resubmit(&self) -> bool {
        self.phase == Phase::Error
            && self.artifact.is_some()
            && matches!(self.error, Some(SessionError::Submission { .. }))
    }
}
