// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 camera capture
//!
//! Opens a Video4Linux2 capture node with the `v4l` crate, negotiates the mode
//! closest to the requested ideal resolution and runs a memory-mapped capture
//! loop on its own thread. The loop keeps only the most recent frame; the
//! session reads it for the preview and for the still capture.

use super::types::*;
use super::{CameraBackend, CameraHandle, LiveStream};
use crate::constants::{V4L2_BUFFER_COUNT, V4L2_POLL_TIMEOUT};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::framesize::FrameSizeEnum;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Formats we can decode, in order of preference on equal resolution
const PREFERRED_FORMATS: [PixelFormat; 5] = [
    PixelFormat::MJPEG,
    PixelFormat::YUYV,
    PixelFormat::UYVY,
    PixelFormat::RGB24,
    PixelFormat::RGBA,
];

/// Enumerate V4L2 nodes that can capture video in a decodable format
pub fn enumerate_cameras() -> Vec<CameraDevice> {
    v4l::context::enum_devices()
        .into_iter()
        .filter_map(|node| {
            let path = node.path().to_string_lossy().to_string();
            let device = Device::with_path(&path).ok()?;
            let caps = device.query_caps().ok()?;
            if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
                return None;
            }

            // Metadata nodes of UVC cameras report capture caps but no usable formats
            let formats = device.enum_formats().ok()?;
            if !formats
                .iter()
                .any(|f| PixelFormat::from_fourcc(&f.fourcc.repr).is_some())
            {
                debug!(path = %path, "Skipping node without decodable formats");
                return None;
            }

            Some(CameraDevice {
                name: caps.card,
                path,
                driver: caps.driver,
                bus_info: caps.bus,
                location: read_sysfs_location(&node),
            })
        })
        .collect()
}

/// Camera location as exposed by some platform drivers through sysfs
fn read_sysfs_location(node: &v4l::context::Node) -> Option<String> {
    let name = node.path().file_name()?.to_string_lossy().to_string();
    let raw = std::fs::read_to_string(format!(
        "/sys/class/video4linux/{}/device/location",
        name
    ))
    .ok()?;
    let location = raw.trim().to_lowercase();
    (!location.is_empty()).then_some(location)
}

/// Pick the device matching the requested facing mode, falling back to the first one
fn select_device(devices: &[CameraDevice], facing: FacingMode) -> Option<&CameraDevice> {
    let wants_front = facing == FacingMode::User;
    devices
        .iter()
        .find(|d| d.is_front_facing() == wants_front)
        .or_else(|| devices.first())
}

/// V4L2 camera backend
pub struct V4l2Backend {
    /// Explicit device path, otherwise auto-selected on acquisition
    device_path: Option<String>,
}

impl V4l2Backend {
    pub fn new(device_path: Option<String>) -> Self {
        Self { device_path }
    }

    fn resolve_device(&self, facing: FacingMode) -> BackendResult<String> {
        if let Some(path) = &self.device_path {
            return Ok(path.clone());
        }

        let devices = enumerate_cameras();
        select_device(&devices, facing)
            .map(|d| {
                info!(name = %d.name, path = %d.path, "Selected camera");
                d.path.clone()
            })
            .ok_or_else(|| BackendError::DeviceNotFound("No camera device found".to_string()))
    }
}

impl CameraBackend for V4l2Backend {
    fn is_supported(&self) -> bool {
        match &self.device_path {
            Some(path) => std::path::Path::new(path).exists(),
            None => !enumerate_cameras().is_empty(),
        }
    }

    fn acquire(
        &self,
        constraints: StreamConstraints,
    ) -> BoxFuture<'_, BackendResult<CameraHandle>> {
        async move {
            let path = self.resolve_device(constraints.facing)?;
            let (ready_tx, ready_rx) = oneshot::channel();
            let running = Arc::new(AtomicBool::new(true));
            let latest: LatestFrame = Arc::new(Mutex::new(None));

            let thread = {
                let path = path.clone();
                let running = running.clone();
                let latest = latest.clone();
                std::thread::Builder::new()
                    .name("v4l2-capture".to_string())
                    .spawn(move || capture_loop(&path, constraints, ready_tx, running, latest))?
            };

            let stream = V4l2Stream {
                running,
                latest,
                thread: Some(thread),
            };

            // Resolves once the first frame has been dequeued
            match ready_rx.await {
                Ok(Ok(())) => Ok(CameraHandle::new(path, Box::new(stream))),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(BackendError::Other(
                    "Capture thread exited before streaming".to_string(),
                )),
            }
        }
        .boxed()
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }
}

type LatestFrame = Arc<Mutex<Option<CameraFrame>>>;

/// Running V4L2 capture stream
struct V4l2Stream {
    running: Arc<AtomicBool>,
    latest: LatestFrame,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl LiveStream for V4l2Stream {
    fn latest_frame(&self) -> Option<CameraFrame> {
        self.latest.lock().ok()?.clone()
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(()) => info!("V4L2 capture thread stopped"),
                Err(_) => warn!("V4L2 capture thread panicked"),
            }
        }
        if let Ok(mut slot) = self.latest.lock() {
            *slot = None;
        }
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Negotiated capture mode
#[derive(Debug, Clone, Copy)]
struct CaptureMode {
    format: PixelFormat,
    width: u32,
    height: u32,
    stride: u32,
}

/// Choose the supported mode closest to the ideal resolution and apply it
fn configure_device(
    device: &Device,
    constraints: &StreamConstraints,
) -> BackendResult<CaptureMode> {
    let descriptions = device.enum_formats()?;
    let mut candidates: Vec<(PixelFormat, u32, u32)> = Vec::new();

    for description in &descriptions {
        let Some(format) = PixelFormat::from_fourcc(&description.fourcc.repr) else {
            continue;
        };
        for size in device.enum_framesizes(description.fourcc).unwrap_or_default() {
            match size.size {
                FrameSizeEnum::Discrete(discrete) => {
                    candidates.push((format, discrete.width, discrete.height));
                }
                FrameSizeEnum::Stepwise(step) => {
                    let width = constraints
                        .ideal_width
                        .clamp(step.min_width, step.max_width);
                    let height = constraints
                        .ideal_height
                        .clamp(step.min_height, step.max_height);
                    candidates.push((format, width, height));
                }
            }
        }
    }

    let (format, width, height) = candidates
        .into_iter()
        .min_by_key(|(format, width, height)| {
            let distance = width.abs_diff(constraints.ideal_width) as u64
                + height.abs_diff(constraints.ideal_height) as u64;
            let rank = PREFERRED_FORMATS
                .iter()
                .position(|f| f == format)
                .unwrap_or(PREFERRED_FORMATS.len());
            (distance, rank)
        })
        .ok_or_else(|| {
            BackendError::FormatNotSupported("device offers no decodable format".to_string())
        })?;

    let requested = Format::new(width, height, FourCC::new(&format.fourcc()));
    let applied = device.set_format(&requested)?;
    let applied_format = PixelFormat::from_fourcc(&applied.fourcc.repr).ok_or_else(|| {
        BackendError::FormatNotSupported(format!("driver switched to {}", applied.fourcc))
    })?;

    info!(
        requested = %format!("{}x{} {:?}", width, height, format),
        applied = %format!("{}x{} {:?}", applied.width, applied.height, applied_format),
        "Configured V4L2 format"
    );

    Ok(CaptureMode {
        format: applied_format,
        width: applied.width,
        height: applied.height,
        stride: if applied_format == PixelFormat::MJPEG {
            0
        } else {
            applied.stride
        },
    })
}

/// Main capture loop running in a separate thread
fn capture_loop(
    device_path: &str,
    constraints: StreamConstraints,
    ready: oneshot::Sender<BackendResult<()>>,
    running: Arc<AtomicBool>,
    latest: LatestFrame,
) {
    info!(device_path, "Opening V4L2 device");

    let setup = Device::with_path(device_path)
        .map_err(BackendError::from)
        .and_then(|device| {
            let mode = configure_device(&device, &constraints)?;
            Ok((device, mode))
        });
    let (device, mode) = match setup {
        Ok(setup) => setup,
        Err(e) => {
            error!(device_path, error = %e, "Failed to open camera");
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut stream =
        match MmapStream::with_buffers(&device, Type::VideoCapture, V4L2_BUFFER_COUNT) {
            Ok(stream) => stream,
            Err(e) => {
                error!(device_path, error = %e, "Failed to start streaming");
                let _ = ready.send(Err(e.into()));
                return;
            }
        };

    // Bounded poll so a stalled device cannot keep `stop` waiting on the join
    stream.set_timeout(V4L2_POLL_TIMEOUT);

    info!(device_path, "V4L2 capture stream started");
    let mut ready = Some(ready);

    while running.load(Ordering::SeqCst) {
        match stream.next() {
            Ok((buf, meta)) => {
                let used = (meta.bytesused as usize).min(buf.len());
                let bytes = if used == 0 { buf } else { &buf[..used] };

                let frame = CameraFrame {
                    width: mode.width,
                    height: mode.height,
                    data: Arc::from(bytes),
                    format: mode.format,
                    stride: mode.stride,
                    captured_at: Instant::now(),
                };
                if let Ok(mut slot) = latest.lock() {
                    *slot = Some(frame);
                }

                // Nobody is waiting for the stream anymore: stop
                if let Some(tx) = ready.take()
                    && tx.send(Ok(())).is_err()
                {
                    debug!(device_path, "Acquisition abandoned before first frame");
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                if ready.as_ref().is_some_and(oneshot::Sender::is_closed) {
                    debug!(device_path, "Acquisition abandoned before first frame");
                    break;
                }
            }
            Err(e) => {
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Err(e.into()));
                    break;
                }
                warn!(error = %e, "Failed to capture frame");
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }

    info!(device_path, "V4L2 capture loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, path: &str) -> CameraDevice {
        CameraDevice {
            name: name.to_string(),
            path: path.to_string(),
            driver: "uvcvideo".to_string(),
            bus_info: String::new(),
            location: None,
        }
    }

    #[test]
    fn test_select_device_prefers_facing() {
        let devices = vec![device("Rear Camera", "/dev/video0"), device("Webcam", "/dev/video2")];

        let front = select_device(&devices, FacingMode::User).unwrap();
        assert_eq!(front.path, "/dev/video2");

        let rear = select_device(&devices, FacingMode::Environment).unwrap();
        assert_eq!(rear.path, "/dev/video0");
    }

    #[test]
    fn test_select_device_falls_back_to_first() {
        let devices = vec![device("Rear Camera", "/dev/video4")];
        let selected = select_device(&devices, FacingMode::User).unwrap();
        assert_eq!(selected.path, "/dev/video4");
        assert!(select_device(&[], FacingMode::User).is_none());
    }

    #[test]
    fn test_missing_explicit_device_is_unsupported() {
        let backend = V4l2Backend::new(Some("/dev/does-not-exist-video".to_string()));
        assert!(!backend.is_supported());
    }
}
