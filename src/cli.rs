// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking a photo through a capture session
//! - Running a full capture and face swap
//! - Probing the backend and printing the configuration

use faceswap_camera::backends::camera::v4l2::enumerate_cameras;
use faceswap_camera::config::Config;
use faceswap_camera::errors::AppError;
use faceswap_camera::session::{Phase, SessionController, SessionSnapshot};
use faceswap_camera::storage;
use faceswap_camera::submission::{SubmissionClient, SubmissionResult, Submitter};
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Time given to the sensor to settle exposure before a still is taken
const WARMUP: Duration = Duration::from_millis(500);

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        println!("  {} ({})", camera.name, camera.path);
        println!("      Driver: {} | Bus: {}", camera.driver, camera.bus_info);
        if let Some(location) = &camera.location {
            println!("      Location: {}", location);
        }
        println!();
    }

    Ok(())
}

/// Print the effective configuration
pub fn print_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Probe the backend liveness endpoint
pub fn check_health(runtime: &Runtime, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = SubmissionClient::new(&config.api)?;
    let healthy = runtime.block_on(client.check_health());

    if healthy {
        println!("Backend at {} is healthy", config.api.base_url);
        Ok(())
    } else {
        Err(format!("Backend at {} is not reachable", config.api.base_url).into())
    }
}

/// Start the session and take one still
async fn capture_once(controller: &SessionController) -> Result<SessionSnapshot, AppError> {
    controller.start().await;
    ensure_phase(controller.snapshot(), Phase::Ready)?;

    println!("Capturing...");
    tokio::time::sleep(WARMUP).await;

    controller.capture().await;
    ensure_phase(controller.snapshot(), Phase::Captured)
}

fn ensure_phase(snapshot: SessionSnapshot, expected: Phase) -> Result<SessionSnapshot, AppError> {
    if snapshot.phase == expected {
        return Ok(snapshot);
    }
    match snapshot.error {
        Some(error) => Err(error.into()),
        None => Err(format!("Session stopped in phase '{}'", snapshot.phase).into()),
    }
}

/// Take a photo and save it
pub fn take_photo(
    runtime: &Runtime,
    controller: SessionController,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = runtime.block_on(async {
        let snapshot = capture_once(&controller).await?;
        let artifact = snapshot
            .artifact
            .ok_or_else(|| AppError::from("No photo was captured"))?;
        println!("Captured {}x{} photo", artifact.width(), artifact.height());

        match output {
            Some(path) if !path.is_dir() => storage::save_artifact_as(&artifact, &path).await,
            Some(dir) => storage::save_artifact(&artifact, &dir).await,
            None => storage::save_artifact(&artifact, &storage::default_save_dir()).await,
        }
    });
    controller.teardown();

    let path = result?;
    println!("Photo saved: {}", path.display());
    Ok(())
}

/// Take a photo, submit it and save the swapped images
pub fn swap_faces(
    runtime: &Runtime,
    controller: SessionController,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = output.unwrap_or_else(storage::default_save_dir);

    let result = runtime.block_on(async {
        capture_once(&controller).await?;

        println!("Swapping faces...");
        controller.submit().await;
        let snapshot = ensure_phase(controller.snapshot(), Phase::Results)?;

        let Some(SubmissionResult::Success(success)) = snapshot.result else {
            return Err(AppError::from("Backend returned no result"));
        };
        if !success.message.is_empty() {
            println!("{}", success.message);
        }
        println!(
            "Faces detected in source: {}",
            success.faces_detected_in_source
        );
        storage::save_results(&success, &output_dir).await
    });
    controller.teardown();

    let paths = result?;
    if paths.is_empty() {
        println!("Backend returned no swapped images");
    }
    for path in paths {
        println!("Saved: {}", path.display());
    }
    Ok(())
}
