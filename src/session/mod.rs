// SPDX-License-Identifier: GPL-3.0-only

//! Capture session state machine
//!
//! ```text
//! idle → initializing → ready → captured → processing → results
//!   │          │          │        │            │
//!   └──────────┴──────────┴────────┴────────────┴──→ error
//! ```
//!
//! The [`SessionController`] is the single writer of the session. Readers get
//! [`SessionSnapshot`]s, either on demand or through a `watch` channel.
//!
//! Every trigger is a short task with suspend points (acquisition, encoding,
//! submission). The state lock is never held across an await; when a task resumes it
//! checks its ticket against the session epoch and discards its result if the session
//! was torn down in the meantime. Only one triggered transition runs at a time.

mod state;

pub use state::{Phase, SessionSnapshot, Transition};

use crate::backends::camera::types::{CameraFrame, StreamConstraints};
use crate::backends::camera::{self, CameraBackend, CameraHandle};
use crate::config::CameraConfig;
use crate::constants::messages;
use crate::errors::{CaptureError, SessionError};
use crate::pipelines::photo::{CapturePipeline, CaptureSettings};
use crate::submission::{SubmissionRequest, SubmissionResult, Submitter};
use state::SessionState;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct Inner {
    id: Uuid,
    backend: Arc<dyn CameraBackend>,
    submitter: Arc<dyn Submitter>,
    pipeline: CapturePipeline,
    constraints: StreamConstraints,
    state: Mutex<SessionState>,
    snapshots: watch::Sender<SessionSnapshot>,
}

/// Drives one capture session
///
/// Cheap to clone; all clones drive the same session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

/// Marks a transition as in flight until dropped
struct InFlight<'a> {
    inner: &'a Inner,
    ticket: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = lock(&self.inner.state);
        if state.epoch != self.ticket || !state.in_flight {
            return;
        }
        state.in_flight = false;

        // Dropped before settling: leave a phase that still accepts a trigger
        let interrupted = match state.phase {
            Phase::Initializing => Some(SessionError::Acquisition(
                messages::CAMERA_ACCESS_FAILED.to_string(),
            )),
            Phase::Ready if state.handle.is_none() => {
                Some(SessionError::Capture(CaptureError::Interrupted))
            }
            Phase::Processing => Some(SessionError::Submission {
                message: messages::FACE_SWAP_FAILED.to_string(),
                detail: Some(messages::REQUEST_CANCELLED.to_string()),
            }),
            _ => None,
        };

        let mut handle = None;
        if let Some(error) = interrupted {
            warn!(
                session = %self.inner.id,
                phase = %state.phase,
                error = %error,
                "Transition cancelled before it settled"
            );
            handle = state.handle.take();
            state.error = Some(error);
            state.phase = Phase::Error;
        }
        self.inner.snapshots.send_replace(state.snapshot());
        drop(state);
        camera::release(&mut handle);
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        submitter: Arc<dyn Submitter>,
        config: &CameraConfig,
    ) -> Self {
        let (snapshots, _) = watch::channel(SessionSnapshot::default());
        let id = Uuid::new_v4();
        debug!(session = %id, backend = %backend.backend_type(), "Session created");

        Self {
            inner: Arc::new(Inner {
                id,
                backend,
                submitter,
                pipeline: CapturePipeline::new(CaptureSettings::from(config)),
                constraints: StreamConstraints::front_facing(
                    config.preview_width,
                    config.preview_height,
                ),
                state: Mutex::new(SessionState::default()),
                snapshots,
            }),
        }
    }

    /// Identifier used in log output
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Current state
    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.inner.state).snapshot()
    }

    /// Receive every published state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Latest live frame for the preview while the camera is held
    pub fn preview_frame(&self) -> Option<CameraFrame> {
        let state = lock(&self.inner.state);
        if state.phase != Phase::Ready {
            return None;
        }
        state.handle.as_ref().and_then(CameraHandle::latest_frame)
    }

    /// Begin the session (mount): `idle → initializing`
    pub async fn start(&self) -> Transition {
        let Some(guard) = self.begin("start", |s| s.phase == Phase::Idle) else {
            return Transition::Ignored;
        };
        self.initialize(&guard).await
    }

    /// Re-run the capability check and acquisition after a camera error
    pub async fn try_again(&self) -> Transition {
        let Some(guard) = self.begin("try_again", SessionState::can_try_again) else {
            return Transition::Ignored;
        };
        self.update(|s| s.reset_outputs());
        self.initialize(&guard).await
    }

    /// Discard the photo and reacquire the camera
    pub async fn retake(&self) -> Transition {
        let Some(guard) = self.begin("retake", |s| {
            s.phase == Phase::Captured || s.can_resubmit()
        }) else {
            return Transition::Ignored;
        };
        self.update(|s| s.reset_outputs());
        self.initialize(&guard).await
    }

    /// Discard the photo, reset to idle, then reacquire the camera
    pub async fn clear(&self) -> Transition {
        let Some(guard) = self.begin("clear", |s| s.phase == Phase::Captured) else {
            return Transition::Ignored;
        };
        self.update(|s| {
            s.reset_outputs();
            self.set_phase(s, Phase::Idle);
        });
        self.initialize(&guard).await
    }

    /// Full reset after viewing results
    pub async fn try_another(&self) -> Transition {
        let Some(guard) = self.begin("try_another", |s| s.phase == Phase::Results) else {
            return Transition::Ignored;
        };
        self.update(|s| {
            s.reset_outputs();
            self.set_phase(s, Phase::Idle);
        });
        self.initialize(&guard).await
    }

    /// Take a still from the live stream: `ready → captured`
    ///
    /// The camera is released as soon as the frame is taken, whatever the outcome.
    pub async fn capture(&self) -> Transition {
        let Some(guard) = self.begin("capture", |s| {
            s.phase == Phase::Ready && s.handle.is_some()
        }) else {
            return Transition::Ignored;
        };

        let (frame, handle) = {
            let mut state = lock(&self.inner.state);
            let handle = state.handle.take();
            let frame = handle.as_ref().and_then(CameraHandle::latest_frame);
            (frame, handle)
        };
        camera::release_blocking(handle).await;

        let outcome = match frame {
            Some(frame) => self.inner.pipeline.capture_and_resize(&frame).await,
            None => Err(CaptureError::NoFrameAvailable),
        };

        let mut state = lock(&self.inner.state);
        if state.is_stale(guard.ticket) {
            debug!(session = %self.inner.id, "Discarding stale capture");
            return Transition::Discarded;
        }

        match outcome {
            Ok(artifact) => {
                info!(
                    session = %self.inner.id,
                    width = artifact.width(),
                    height = artifact.height(),
                    bytes = artifact.payload().len(),
                    "Photo captured"
                );
                state.artifact = Some(Arc::new(artifact));
                self.set_phase(&mut state, Phase::Captured);
            }
            Err(e) => {
                warn!(session = %self.inner.id, error = %e, "Capture failed");
                self.fail(&mut state, SessionError::Capture(e));
            }
        }
        Transition::Applied(state.phase)
    }

    /// Send the photo to the backend: `captured → processing → results | error`
    pub async fn submit(&self) -> Transition {
        let Some(guard) = self.begin("submit", |s| {
            s.phase == Phase::Captured && s.artifact.is_some()
        }) else {
            return Transition::Ignored;
        };
        self.process(&guard).await
    }

    /// Submit the retained photo again after a submission failure
    pub async fn resubmit(&self) -> Transition {
        let Some(guard) = self.begin("resubmit", SessionState::can_resubmit) else {
            return Transition::Ignored;
        };
        self.process(&guard).await
    }

    /// Release the camera and stop applying results. Terminal for this session.
    pub fn teardown(&self) {
        let mut handle = {
            let mut state = lock(&self.inner.state);
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            state.epoch += 1;
            state.in_flight = false;
            let handle = state.handle.take();
            self.inner.snapshots.send_replace(state.snapshot());
            handle
        };
        info!(session = %self.inner.id, "Session torn down");
        camera::release(&mut handle);
    }

    fn begin(
        &self,
        trigger: &str,
        valid: impl FnOnce(&SessionState) -> bool,
    ) -> Option<InFlight<'_>> {
        let mut state = lock(&self.inner.state);
        if state.torn_down || state.in_flight || !valid(&state) {
            debug!(
                session = %self.inner.id,
                trigger,
                phase = %state.phase,
                busy = state.in_flight,
                "Trigger ignored"
            );
            return None;
        }
        state.in_flight = true;
        self.inner.snapshots.send_replace(state.snapshot());
        Some(InFlight {
            inner: &self.inner,
            ticket: state.epoch,
        })
    }

    fn update(&self, f: impl FnOnce(&mut SessionState)) {
        let mut state = lock(&self.inner.state);
        f(&mut state);
        self.inner.snapshots.send_replace(state.snapshot());
    }

    fn set_phase(&self, state: &mut SessionState, phase: Phase) {
        if state.phase != phase {
            info!(
                session = %self.inner.id,
                from = %state.phase,
                to = %phase,
                "Session phase changed"
            );
        }
        state.phase = phase;
        self.inner.snapshots.send_replace(state.snapshot());
    }

    fn fail(&self, state: &mut SessionState, error: SessionError) {
        warn!(session = %self.inner.id, error = %error, "Session error");
        state.error = Some(error);
        self.set_phase(state, Phase::Error);
    }

    /// Probe, then acquire: `→ initializing → ready | error`
    async fn initialize(&self, guard: &InFlight<'_>) -> Transition {
        let supported = self.inner.backend.is_supported();
        let previous = {
            let mut state = lock(&self.inner.state);
            let previous = state.handle.take();
            if supported {
                self.set_phase(&mut state, Phase::Initializing);
            } else {
                self.fail(&mut state, SessionError::UnsupportedPlatform);
            }
            previous
        };
        camera::release_blocking(previous).await;
        if !supported {
            return Transition::Applied(Phase::Error);
        }

        let acquired = self
            .inner
            .backend
            .acquire(self.inner.constraints)
            .await;

        let late = {
            let mut state = lock(&self.inner.state);
            if !state.is_stale(guard.ticket) {
                match acquired {
                    Ok(handle) => {
                        info!(session = %self.inner.id, source = %handle.label(), "Camera ready");
                        state.handle = Some(handle);
                        self.set_phase(&mut state, Phase::Ready);
                    }
                    Err(e) => self.fail(&mut state, SessionError::acquisition(&e)),
                }
                return Transition::Applied(state.phase);
            }
            acquired
        };

        debug!(session = %self.inner.id, "Discarding stale acquisition");
        camera::release_blocking(late.ok()).await;
        Transition::Discarded
    }

    async fn process(&self, guard: &InFlight<'_>) -> Transition {
        let request = {
            let mut state = lock(&self.inner.state);
            let Some(artifact) = state.artifact.clone() else {
                return Transition::Ignored;
            };
            state.error = None;
            state.result = None;
            self.set_phase(&mut state, Phase::Processing);
            SubmissionRequest::new(artifact)
        };

        let result = self.inner.submitter.submit(request).await;

        let mut state = lock(&self.inner.state);
        if state.is_stale(guard.ticket) {
            debug!(session = %self.inner.id, "Discarding stale submission result");
            return Transition::Discarded;
        }

        let error = match &result {
            SubmissionResult::Success(_) => None,
            SubmissionResult::Failure(failure) => Some(SessionError::Submission {
                message: failure.message.clone(),
                detail: failure.detail.clone(),
            }),
        };
        state.result = Some(result);
        match error {
            None => self.set_phase(&mut state, Phase::Results),
            Some(error) => self.fail(&mut state, error),
        }
        Transition::Applied(state.phase)
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("id", &self.inner.id)
            .field("phase", &self.snapshot().phase)
            .finish()
    }
}
