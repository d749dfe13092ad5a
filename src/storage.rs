// SPDX-License-Identifier: GPL-3.0-only

//! Saving captured photos and face-swap results

use crate::constants::DEFAULT_SAVE_FOLDER;
use crate::errors::{AppError, AppResult};
use crate::pipelines::photo::CapturedArtifact;
use crate::submission::SwapSuccess;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// `~/Pictures/FaceSwap`, falling back to the home or current directory
pub fn default_save_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_SAVE_FOLDER)
}

fn timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Keep only characters that are safe in a file name
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "result".to_string()
    } else {
        cleaned
    }
}

fn extension_for(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("jpg")
}

/// Write the captured JPEG into `dir` as `IMG_<timestamp>.jpg`
pub async fn save_artifact(artifact: &CapturedArtifact, dir: &Path) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("IMG_{}.jpg", timestamp(artifact.captured_at())));
    tokio::fs::write(&path, artifact.payload()).await?;
    info!(path = %path.display(), bytes = artifact.payload().len(), "Photo saved");
    Ok(path)
}

/// Write the captured JPEG to an exact file path
pub async fn save_artifact_as(artifact: &CapturedArtifact, path: &Path) -> AppResult<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, artifact.payload()).await?;
    info!(path = %path.display(), "Photo saved");
    Ok(path.to_path_buf())
}

/// Decode and write every swapped image, preserving the backend's order
pub async fn save_results(success: &SwapSuccess, dir: &Path) -> AppResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;
    let stamp = timestamp(Local::now());
    let mut saved = Vec::with_capacity(success.images.len());

    for (index, image) in success.images.iter().enumerate() {
        let bytes = image.decode().map_err(|e| {
            AppError::Decode(format!("swapped image {} is not base64: {}", index + 1, e))
        })?;
        let name = format!(
            "SWAP_{}_{}_{}.{}",
            stamp,
            index + 1,
            sanitize_name(&image.destination_name),
            extension_for(&bytes)
        );
        let path = dir.join(name);
        tokio::fs::write(&path, &bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "Swapped image saved");
        saved.push(path);
    }

    info!(count = saved.len(), dir = %dir.display(), "Face swap results saved");
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::SwappedImage;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Mona Lisa"), "Mona_Lisa");
        assert_eq!(sanitize_name("../etc"), "___etc");
        assert_eq!(sanitize_name("  "), "result");
    }

    #[test]
    fn test_extension_detection() {
        assert_eq!(extension_for(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(extension_for(b"\x89PNG\r\n\x1a\n"), "png");
        assert_eq!(extension_for(b"unknown"), "jpg");
    }

    #[tokio::test]
    async fn test_save_results_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let success = SwapSuccess {
            message: "ok".to_string(),
            images: vec![
                SwappedImage {
                    image_data: STANDARD.encode(b"first"),
                    destination_name: "a".to_string(),
                },
                SwappedImage {
                    image_data: STANDARD.encode(b"second"),
                    destination_name: "b".to_string(),
                },
            ],
            faces_detected_in_source: 1,
        };

        let saved = save_results(&success, dir.path()).await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(std::fs::read(&saved[0]).unwrap(), b"first");
        assert_eq!(std::fs::read(&saved[1]).unwrap(), b"second");
        assert!(saved[0].to_string_lossy().contains("_1_a."));
    }

    #[tokio::test]
    async fn test_save_results_rejects_bad_base64() {
        let dir = tempfile::tempdir().unwrap();
        let success = SwapSuccess {
            message: String::new(),
            images: vec![SwappedImage {
                image_data: "***".to_string(),
                destination_name: String::new(),
            }],
            faces_detected_in_source: 0,
        };
        assert!(matches!(
            save_results(&success, dir.path()).await,
            Err(AppError::Decode(_))
        ));
    }
}
