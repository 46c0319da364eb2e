//! Host-side halves of the grayscale-resize kernel: input validation,
//! RGBA packing for the GPU, and the CPU evaluation of the same sampling.

use crate::preprocessing::domain::tensor_preprocessor::PreprocessError;
use crate::shared::frame::Frame;

/// Rec. 709 luma weights.
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

pub(crate) fn validate(frame: &Frame) -> Result<(), PreprocessError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(PreprocessError::EmptyImage {
            width: frame.width(),
            height: frame.height(),
        });
    }
    match frame.channels() {
        1 | 3 | 4 => Ok(()),
        c => Err(PreprocessError::UnsupportedChannels(c)),
    }
}

fn rgb_at(data: &[u8], channels: usize, pixel: usize) -> [u8; 3] {
    let i = pixel * channels;
    if channels == 1 {
        [data[i]; 3]
    } else {
        [data[i], data[i + 1], data[i + 2]]
    }
}

/// One u32 per pixel, R in the low byte, alpha forced opaque.
pub(crate) fn pack_rgba(frame: &Frame) -> Vec<u32> {
    let channels = frame.channels() as usize;
    let count = (frame.width() * frame.height()) as usize;
    let data = frame.data();
    (0..count)
        .map(|p| {
            let [r, g, b] = rgb_at(data, channels, p);
            u32::from_le_bytes([r, g, b, 255])
        })
        .collect()
}

/// Bilinear sample at each output pixel center with clamp-to-edge
/// addressing, converted to luminance scaled to 0..=255.
pub(crate) fn grayscale_resize(frame: &Frame, out_size: usize) -> Vec<f32> {
    let w = frame.width() as i64;
    let h = frame.height() as i64;
    let channels = frame.channels() as usize;
    let data = frame.data();

    let texel = |x: i64, y: i64| -> [f32; 3] {
        let cx = x.clamp(0, w - 1);
        let cy = y.clamp(0, h - 1);
        let rgb = rgb_at(data, channels, (cy * w + cx) as usize);
        rgb.map(|c| c as f32 / 255.0)
    };
    let lerp = |a: [f32; 3], b: [f32; 3], t: f32| -> [f32; 3] {
        [
            a[0] + (b[0] - a[0]) * t,
            a[1] + (b[1] - a[1]) * t,
            a[2] + (b[2] - a[2]) * t,
        ]
    };

    let size = out_size as f32;
    let mut out = Vec::with_capacity(out_size * out_size);
    for oy in 0..out_size {
        let py = (oy as f32 + 0.5) / size * h as f32 - 0.5;
        let by = py.floor();
        let fy = py - by;
        let y0 = by as i64;
        for ox in 0..out_size {
            let px = (ox as f32 + 0.5) / size * w as f32 - 0.5;
            let bx = px.floor();
            let fx = px - bx;
            let x0 = bx as i64;

            let top = lerp(texel(x0, y0), texel(x0 + 1, y0), fx);
            let bottom = lerp(texel(x0, y0 + 1), texel(x0 + 1, y0 + 1), fx);
            let rgb = lerp(top, bottom, fy);
            let luma = rgb[0] * LUMA[0] + rgb[1] * LUMA[1] + rgb[2] * LUMA[2];
            out.push(luma * 255.0);
        }
    }
    out
}
