// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera access
//!
//! - [`camera`]: capability probe, stream acquisition and release

pub mod camera;
