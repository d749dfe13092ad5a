// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion utilities
//!
//! Converts the raw layouts V4L2 devices deliver into tightly packed RGB24, the
//! layout the capture pipeline rasterizes from. All functions honor the row stride
//! and return `None` when the buffer is too short for the declared geometry.

/// Convert packed 4:2:2 data (YUYV or UYVY) to RGB24
///
/// Each 4-byte group encodes 2 pixels sharing chroma. Uses BT.601 coefficients.
pub fn packed_422_to_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    uyvy: bool,
) -> Option<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    if w == 0 || h == 0 {
        return None;
    }
    let stride = if stride == 0 { w * 2 } else { stride as usize };
    if stride < w * 2 || data.len() < stride * h.saturating_sub(1) + w * 2 {
        return None;
    }

    let mut rgb = Vec::with_capacity(w * h * 3);
    for row in data.chunks(stride).take(h) {
        for (i, chunk) in row[..w * 2].chunks(4).enumerate() {
            // Odd widths leave a trailing half group: reuse its single luma sample
            let (y0, u, y1, v) = match (uyvy, chunk.len()) {
                (false, 4) => (chunk[0], chunk[1], chunk[2], chunk[3]),
                (true, 4) => (chunk[1], chunk[0], chunk[3], chunk[2]),
                (false, _) => (chunk[0], chunk[1], chunk[0], 128),
                (true, _) => (chunk[1], chunk[0], chunk[1], 128),
            };
            for (j, y) in [y0, y1].into_iter().enumerate() {
                if i * 2 + j >= w {
                    break;
                }
                rgb.extend_from_slice(&yuv_to_rgb(y, u, v));
            }
        }
    }

    Some(rgb)
}

/// Convert RGBA (with row stride) to RGB24, dropping alpha
pub fn rgba_to_rgb(data: &[u8], width: u32, height: u32, stride: u32) -> Option<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    if w == 0 || h == 0 {
        return None;
    }
    let stride = if stride == 0 { w * 4 } else { stride as usize };
    if stride < w * 4 || data.len() < stride * h.saturating_sub(1) + w * 4 {
        return None;
    }

    let mut rgb = Vec::with_capacity(w * h * 3);
    for row in data.chunks(stride).take(h) {
        for px in row[..w * 4].chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
    }
    Some(rgb)
}

/// Strip row padding from RGB24 data
pub fn rgb24_compact(data: &[u8], width: u32, height: u32, stride: u32) -> Option<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    if w == 0 || h == 0 {
        return None;
    }
    let stride = if stride == 0 { w * 3 } else { stride as usize };
    if stride < w * 3 || data.len() < stride * h.saturating_sub(1) + w * 3 {
        return None;
    }

    if stride == w * 3 {
        return Some(data[..w * h * 3].to_vec());
    }

    let mut rgb = Vec::with_capacity(w * h * 3);
    for row in data.chunks(stride).take(h) {
        rgb.extend_from_slice(&row[..w * 3]);
    }
    Some(rgb)
}

/// Convert YUV (BT.601) to RGB
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    [r, g, b]
}
