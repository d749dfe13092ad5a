// SPDX-License-Identifier: GPL-3.0-only

//! Environment-provided configuration
//!
//! The configuration is read once at process start. Every key is optional and falls
//! back to the defaults in [`crate::constants`].

use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const ENV_API_BASE_URL: &str = "FACESWAP_API_BASE_URL";
pub const ENV_PREVIEW_WIDTH: &str = "FACESWAP_CAMERA_PREVIEW_WIDTH";
pub const ENV_PREVIEW_HEIGHT: &str = "FACESWAP_CAMERA_PREVIEW_HEIGHT";
pub const ENV_RESIZE_WIDTH: &str = "FACESWAP_CAMERA_RESIZE_WIDTH";
pub const ENV_RESIZE_HEIGHT: &str = "FACESWAP_CAMERA_RESIZE_HEIGHT";
pub const ENV_QUALITY: &str = "FACESWAP_CAMERA_QUALITY";
pub const ENV_DEVICE: &str = "FACESWAP_CAMERA_DEVICE";
pub const ENV_REQUEST_TIMEOUT: &str = "FACESWAP_REQUEST_TIMEOUT_SECS";

/// Backend endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL without trailing slash (e.g. `http://localhost:8000`)
    pub base_url: String,
    /// Timeout for a single submission
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Full URL of the face-swap endpoint
    pub fn swap_url(&self) -> String {
        format!("{}{}", self.base_url, SWAP_ENDPOINT)
    }

    /// Full URL of the liveness endpoint
    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url, HEALTH_ENDPOINT)
    }
}

/// Camera acquisition and capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Ideal acquisition width
    pub preview_width: u32,
    /// Ideal acquisition height
    pub preview_height: u32,
    /// Captured photo width
    pub resize_width: u32,
    /// Captured photo height
    pub resize_height: u32,
    /// JPEG quality in `[0, 1]`
    pub quality: f32,
    /// Explicit V4L2 device (e.g. `/dev/video2`), otherwise auto-selected
    pub device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub camera: CameraConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_BASE_URL.to_string(),
                request_timeout: DEFAULT_REQUEST_TIMEOUT,
            },
            camera: CameraConfig {
                preview_width: DEFAULT_PREVIEW_WIDTH,
                preview_height: DEFAULT_PREVIEW_HEIGHT,
                resize_width: DEFAULT_RESIZE_WIDTH,
                resize_height: DEFAULT_RESIZE_HEIGHT,
                quality: DEFAULT_QUALITY,
                device: None,
            },
        }
    }
}

impl Config {
    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = lookup(ENV_API_BASE_URL)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api.base_url);

        let request_timeout = parse_positive(&lookup, ENV_REQUEST_TIMEOUT)
            .map(Duration::from_secs)
            .unwrap_or(defaults.api.request_timeout);

        let quality = match parse_value::<f32, _>(&lookup, ENV_QUALITY) {
            Some(q) if q.is_finite() => q.clamp(0.0, 1.0),
            Some(q) => {
                warn!(key = ENV_QUALITY, value = q, "Ignoring non-finite quality");
                defaults.camera.quality
            }
            None => defaults.camera.quality,
        };

        Self {
            api: ApiConfig {
                base_url,
                request_timeout,
            },
            camera: CameraConfig {
                preview_width: parse_positive(&lookup, ENV_PREVIEW_WIDTH)
                    .unwrap_or(defaults.camera.preview_width),
                preview_height: parse_positive(&lookup, ENV_PREVIEW_HEIGHT)
                    .unwrap_or(defaults.camera.preview_height),
                resize_width: parse_positive(&lookup, ENV_RESIZE_WIDTH)
                    .unwrap_or(defaults.camera.resize_width),
                resize_height: parse_positive(&lookup, ENV_RESIZE_HEIGHT)
                    .unwrap_or(defaults.camera.resize_height),
                quality,
                device: lookup(ENV_DEVICE).filter(|d| !d.trim().is_empty()),
            },
        }
    }
}

fn parse_value<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable configuration value");
            None
        }
    }
}

fn parse_positive<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default + Copy,
    F: Fn(&str) -> Option<String>,
{
    let value = parse_value::<T, F>(lookup, key)?;
    if value > T::default() {
        Some(value)
    } else {
        warn!(key, "Ignoring non-positive configuration value");
        None
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
