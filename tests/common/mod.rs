// SPDX-License-Identifier: GPL-3.0-only

//! Shared fakes for integration tests

#![allow(dead_code)]

use axum::Router;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use faceswap_camera::backends::camera::{
    BackendError, BackendResult, CameraBackend, CameraBackendType, CameraFrame, CameraHandle,
    LiveStream, StreamConstraints,
};
use faceswap_camera::config::{ApiConfig, CameraConfig, Config};
use faceswap_camera::session::SessionController;
use faceswap_camera::submission::{
    SubmissionFailure, SubmissionRequest, SubmissionResult, Submitter, SwapSuccess, SwappedImage,
};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Solid-ish RGBA test frame
pub fn test_frame(width: u32, height: u32) -> CameraFrame {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x % 251) as u8, (y % 241) as u8, 90, 255]);
        }
    }
    CameraFrame::from_rgba(width, height, data)
}

pub fn camera_config() -> CameraConfig {
    Config::default().camera
}

pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        request_timeout: Duration::from_secs(10),
    }
}

struct MockStream {
    frame: Option<CameraFrame>,
    stops: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl LiveStream for MockStream {
    fn latest_frame(&self) -> Option<CameraFrame> {
        self.frame.clone()
    }

    fn stop(&mut self) {
        self.frame = None;
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

type ProbeHook = Box<dyn Fn() + Send + Sync>;

/// In-process camera with controllable support, failures and a gate on acquisition
pub struct MockBackend {
    supported: AtomicBool,
    failure: Mutex<Option<BackendError>>,
    frame: Mutex<Option<CameraFrame>>,
    gate: Option<Arc<Semaphore>>,
    probe_hook: Mutex<Option<ProbeHook>>,
    pub probes: AtomicUsize,
    pub acquires: AtomicUsize,
    pub stops: Arc<AtomicUsize>,
    pub live: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            supported: AtomicBool::new(true),
            failure: Mutex::new(None),
            frame: Mutex::new(Some(test_frame(1280, 720))),
            gate: None,
            probe_hook: Mutex::new(None),
            probes: AtomicUsize::new(0),
            acquires: AtomicUsize::new(0),
            stops: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Acquisitions block until [`MockBackend::open_gate`] is called
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Self {
            gate: Some(gate.clone()),
            ..Self::new()
        };
        (backend, gate)
    }

    pub fn unsupported() -> Self {
        let backend = Self::new();
        backend.set_supported(false);
        backend
    }

    pub fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::SeqCst);
    }

    pub fn fail_with(&self, error: Option<BackendError>) {
        *self.failure.lock().unwrap() = error;
    }

    pub fn set_frame(&self, frame: Option<CameraFrame>) {
        *self.frame.lock().unwrap() = frame;
    }

    pub fn on_probe(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.probe_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn acquire_count(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }
}

impl CameraBackend for MockBackend {
    fn is_supported(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.probe_hook.lock().unwrap().as_ref() {
            hook();
        }
        self.supported.load(Ordering::SeqCst)
    }

    fn acquire(
        &self,
        _constraints: StreamConstraints,
    ) -> BoxFuture<'_, BackendResult<CameraHandle>> {
        async move {
            self.acquires.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate closed").forget();
            }

            let failure = self.failure.lock().unwrap().clone();
            if let Some(error) = failure {
                return Err(error);
            }

            let frame = self.frame.lock().unwrap().clone();
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(CameraHandle::new(
                "mock",
                Box::new(MockStream {
                    frame,
                    stops: self.stops.clone(),
                    live: self.live.clone(),
                }),
            ))
        }
        .boxed()
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::File
    }
}

/// Scripted submitter
pub struct MockSubmitter {
    responses: Mutex<VecDeque<SubmissionResult>>,
    gate: Option<Arc<Semaphore>>,
    pub requests: Mutex<Vec<SubmissionRequest>>,
}

impl MockSubmitter {
    pub fn new(responses: Vec<SubmissionResult>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            gate: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(responses: Vec<SubmissionResult>) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let submitter = Self {
            gate: Some(gate.clone()),
            ..Self::new(responses)
        };
        (submitter, gate)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Submitter for MockSubmitter {
    fn submit(&self, request: SubmissionRequest) -> BoxFuture<'_, SubmissionResult> {
        async move {
            self.requests.lock().unwrap().push(request);
            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate closed").forget();
            }
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| {
                SubmissionResult::Failure(SubmissionFailure::new("no scripted response"))
            })
        }
        .boxed()
    }

    fn check_health(&self) -> BoxFuture<'_, bool> {
        async { true }.boxed()
    }
}

pub fn success_with(names: &[&str]) -> SubmissionResult {
    SubmissionResult::Success(SwapSuccess {
        message: format!("Swapped {} faces", names.len()),
        images: names
            .iter()
            .map(|name| SwappedImage {
                image_data: STANDARD.encode(name.as_bytes()),
                destination_name: name.to_string(),
            })
            .collect(),
        faces_detected_in_source: 1,
    })
}

pub fn failure(message: &str) -> SubmissionResult {
    SubmissionResult::Failure(SubmissionFailure::new(message))
}

pub fn session(backend: Arc<MockBackend>, submitter: Arc<MockSubmitter>) -> SessionController {
    SessionController::new(backend, submitter, &camera_config())
}

/// What the mock API received in one multipart upload
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub image: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub fields: HashMap<String, String>,
}

pub type Uploads = Arc<Mutex<Vec<Upload>>>;

/// How the mock swap endpoint answers
#[derive(Clone)]
pub enum SwapReply {
    /// 200 with the uploaded image returned under each name
    Echo(Vec<String>),
    /// Fixed status and raw body
    Raw(StatusCode, String),
}

#[derive(Clone)]
struct MockApi {
    uploads: Uploads,
    reply: SwapReply,
}

async fn swap_handler(State(api): State<MockApi>, mut multipart: Multipart) -> Response {
    let mut upload = Upload::default();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            upload.file_name = field.file_name().map(str::to_string);
            upload.content_type = field.content_type().map(str::to_string);
            upload.image = field.bytes().await.unwrap().to_vec();
        } else {
            let value = field.text().await.unwrap();
            upload.fields.insert(name, value);
        }
    }

    let encoded = STANDARD.encode(&upload.image);
    api.uploads.lock().unwrap().push(upload);

    match api.reply {
        SwapReply::Echo(names) => {
            let images: Vec<_> = names
                .iter()
                .map(|name| {
                    serde_json::json!({ "image_data": encoded, "destination_name": name })
                })
                .collect();
            axum::Json(serde_json::json!({
                "success": true,
                "message": "Face swap completed",
                "swapped_images": images,
                "faces_detected_in_source": 1
            }))
            .into_response()
        }
        SwapReply::Raw(status, body) => (status, body).into_response(),
    }
}

/// Serve the mock face-swap API on an ephemeral port; returns its base URL
pub async fn spawn_mock_api(reply: SwapReply) -> (String, Uploads) {
    let uploads: Uploads = Arc::new(Mutex::new(Vec::new()));
    let api = MockApi {
        uploads: uploads.clone(),
        reply,
    };
    let router = Router::new()
        .route("/api/v1/swap", post(swap_handler))
        .route("/api/v1/health", get(|| async { "ok" }))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}", addr), uploads)
}

/// A base URL nothing listens on
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
