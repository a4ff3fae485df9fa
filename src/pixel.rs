//! RGB to YUV 4:2:0 packing.
//!
//! Converts an arbitrary-sized RGB frame into the semi-planar 4:2:0 byte
//! layout the video encoder consumes: a full-resolution luma plane followed
//! by 2x2-subsampled interleaved chroma. Fixed-point BT.601-style
//! coefficients; nearest-neighbour scaling when source and target
//! dimensions differ. Pure function: identical input bytes always produce
//! identical output bytes.

use crate::media::RgbFrame;

/// Packs `frame` into `target_width * target_height * 3 / 2` bytes of
/// semi-planar YUV 4:2:0, scaling first if dimensions differ.
///
/// Target dimensions are expected to be even (encoder alignment); odd
/// trailing chroma positions are simply not emitted.
#[must_use]
pub fn pack_yuv420(frame: &RgbFrame, target_width: u32, target_height: u32) -> Vec<u8> {
    let scaled;
    let rgb: &[u8] = if frame.width == target_width && frame.height == target_height {
        &frame.data
    } else {
        scaled = scale_nearest(frame, target_width, target_height);
        &scaled
    };

    let width = target_width as usize;
    let height = target_height as usize;
    let y_plane_size = width * height;
    let mut yuv = vec![0u8; y_plane_size * 3 / 2];
    let mut uv_index = y_plane_size;

    for row in 0..height {
        for col in 0..width {
            let idx = (row * width + col) * 3;
            let r = i32::from(rgb[idx]);
            let g = i32::from(rgb[idx + 1]);
            let b = i32::from(rgb[idx + 2]);

            let y = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
            yuv[row * width + col] = y as u8;

            // Chroma sampled at even row/column positions only (2x2).
            if row % 2 == 0 && col % 2 == 0 && uv_index + 1 < yuv.len() {
                let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
                let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
                yuv[uv_index] = u as u8;
                yuv[uv_index + 1] = v as u8;
                uv_index += 2;
            }
        }
    }
    yuv
}

/// Nearest-neighbour scale of an RGB frame to the target dimensions.
fn scale_nearest(frame: &RgbFrame, target_width: u32, target_height: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity((target_width * target_height * 3) as usize);
    for y in 0..target_height {
        let src_y = (u64::from(y) * u64::from(frame.height) / u64::from(target_height)) as u32;
        for x in 0..target_width {
            let src_x = (u64::from(x) * u64::from(frame.width) / u64::from(target_width)) as u32;
            let (r, g, b) = frame.rgb_at(src_x, src_y);
            out.extend_from_slice(&[r, g, b]);
        }
    }
    out
}
