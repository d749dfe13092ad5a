// SPDX-License-Identifier: GPL-3.0-only

//! Capture pipeline tests: resize, transport round-trip and saving

mod common;

use common::*;
use faceswap_camera::backends::camera::CameraBackend;
use faceswap_camera::backends::camera::file_source::FileSourceBackend;
use faceswap_camera::pipelines::photo::encoding::from_data_url;
use faceswap_camera::pipelines::photo::{CapturePipeline, CaptureSettings};
use faceswap_camera::session::{Phase, SessionController, Transition};
use faceswap_camera::storage;
use faceswap_camera::submission::{
    SubmissionClient, SubmissionRequest, SubmissionResult, Submitter,
};
use std::sync::Arc;

fn pipeline_640() -> CapturePipeline {
    CapturePipeline::new(CaptureSettings {
        width: 640,
        height: 640,
        quality: 0.8,
    })
}

#[tokio::test]
async fn test_transport_round_trip_is_byte_identical() {
    let (base_url, uploads) = spawn_mock_api(SwapReply::Echo(vec!["echo".to_string()])).await;
    let artifact = Arc::new(
        pipeline_640()
            .capture_and_resize(&test_frame(1280, 720))
            .await
            .unwrap(),
    );
    let raster = artifact.decode().unwrap();

    let client = SubmissionClient::new(&api_config(&base_url)).unwrap();
    let result = client.submit(SubmissionRequest::new(artifact.clone())).await;

    // What the backend received
    let received = uploads.lock().unwrap()[0].image.clone();
    assert_eq!(received, artifact.payload());
    let decoded = image::load_from_memory(&received).unwrap().to_rgb8();
    assert_eq!(decoded, raster);

    // What came back
    let SubmissionResult::Success(success) = result else {
        panic!("expected success");
    };
    assert_eq!(success.images[0].decode().unwrap(), artifact.payload());

    // What the preview shows
    assert_eq!(
        from_data_url(artifact.display_url()).unwrap(),
        artifact.payload()
    );
}

#[tokio::test]
async fn test_lower_quality_gives_smaller_payload() {
    let frame = test_frame(640, 480);
    let high = CapturePipeline::new(CaptureSettings {
        width: 320,
        height: 320,
        quality: 1.0,
    })
    .capture_and_resize(&frame)
    .await
    .unwrap();
    let low = CapturePipeline::new(CaptureSettings {
        width: 320,
        height: 320,
        quality: 0.1,
    })
    .capture_and_resize(&frame)
    .await
    .unwrap();

    assert!(low.payload().len() < high.payload().len());
    assert_eq!((low.width(), low.height()), (high.width(), high.height()));
}

#[tokio::test]
async fn test_file_source_session_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("portrait.png");
    image::RgbImage::from_pixel(300, 200, image::Rgb([40, 120, 200]))
        .save(&source)
        .unwrap();

    let backend = FileSourceBackend::new(source);
    assert!(backend.is_supported());

    let controller = SessionController::new(
        Arc::new(backend),
        Arc::new(MockSubmitter::new(Vec::new())),
        &camera_config(),
    );
    assert_eq!(controller.start().await, Transition::Applied(Phase::Ready));
    assert_eq!(controller.capture().await, Transition::Applied(Phase::Captured));

    let artifact = controller.snapshot().artifact.unwrap();
    let out = dir.path().join("out");
    let path = storage::save_artifact(&artifact, &out).await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), artifact.payload());

    let exact = dir.path().join("nested").join("photo.jpg");
    let path = storage::save_artifact_as(&artifact, &exact).await.unwrap();
    assert_eq!(path, exact);
    let saved = image::open(&exact).unwrap();
    assert_eq!((saved.width(), saved.height()), (640, 640));

    controller.teardown();
}

#[tokio::test]
async fn test_missing_file_source_is_unsupported() {
    let backend = FileSourceBackend::new("/nonexistent/portrait.png".into());
    let controller = SessionController::new(
        Arc::new(backend),
        Arc::new(MockSubmitter::new(Vec::new())),
        &camera_config(),
    );
    assert_eq!(controller.start().await, Transition::Applied(Phase::Error));
    assert_eq!(
        controller.snapshot().error_message().as_deref(),
        Some("Camera is not supported by this browser")
    );
}
