//! RGB to luminance conversion for the landmark tracker input.
//!
//! Uses the fixed BT.601 weights so repeated conversion of the same frame
//! is bit-identical.

use crate::shared::frame::{Frame, GrayFrame};

const R_WEIGHT: f32 = 0.299;
const G_WEIGHT: f32 = 0.587;
const B_WEIGHT: f32 = 0.114;

/// Derives a single-channel luminance image with the same spatial
/// dimensions as `frame`. A zero-sized frame yields a zero-sized result.
pub fn to_grayscale(frame: &Frame) -> GrayFrame {
    let width = frame.width();
    let height = frame.height();
    let rgb = frame.data();

    let mut data = Vec::with_capacity((width as usize) * (height as usize));
    for px in rgb.chunks_exact(3) {
        let y = R_WEIGHT * px[0] as f32 + G_WEIGHT * px[1] as f32 + B_WEIGHT * px[2] as f32;
        data.push(y.round() as u8);
    }

    GrayFrame::new(data, width, height)
}
