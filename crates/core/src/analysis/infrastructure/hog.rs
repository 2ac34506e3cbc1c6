//! Dense histogram-of-oriented-gradients appearance descriptor.
//!
//! Computed over the grayscale aligned face crop. The layout is one row
//! per cell row and `cells_x * ORIENTATION_BINS` columns, so the declared
//! dimensions fully describe the buffer.

use crate::analysis::domain::descriptor::FeatureDescriptor;
use crate::shared::frame::GrayFrame;

pub const CELL_SIZE: usize = 8;
pub const ORIENTATION_BINS: usize = 9;

const NORM_EPSILON: f64 = 1e-6;

/// Descriptor length for a square `size × size` input.
pub fn descriptor_len(size: u32) -> usize {
    let cells = size as usize / CELL_SIZE;
    cells * cells * ORIENTATION_BINS
}

/// Extract the descriptor. Pixels beyond the last full cell are ignored;
/// an input smaller than one cell yields an empty descriptor.
pub fn extract(gray: &GrayFrame) -> FeatureDescriptor {
    let h = gray.height() as usize;
    let w = gray.width() as usize;
    let cells_y = h / CELL_SIZE;
    let cells_x = w / CELL_SIZE;

    let mut histograms = vec![0.0f64; cells_y * cells_x * ORIENTATION_BINS];

    for y in 0..cells_y * CELL_SIZE {
        let cell_y = y / CELL_SIZE;
        for x in 0..cells_x * CELL_SIZE {
            let gx = gray.sample_clamped(y as i64, x as i64 + 1) as f64
                - gray.sample_clamped(y as i64, x as i64 - 1) as f64;
            let gy = gray.sample_clamped(y as i64 + 1, x as i64) as f64
                - gray.sample_clamped(y as i64 - 1, x as i64) as f64;

            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude == 0.0 {
                continue;
            }

            // Unsigned orientation in [0, PI)
            let mut angle = gy.atan2(gx);
            if angle < 0.0 {
                angle += std::f64::consts::PI;
            }
            let bin = ((angle / std::f64::consts::PI * ORIENTATION_BINS as f64) as usize)
                .min(ORIENTATION_BINS - 1);

            let cell_x = x / CELL_SIZE;
            histograms[(cell_y * cells_x + cell_x) * ORIENTATION_BINS + bin] += magnitude;
        }
    }

    // L2-normalize each cell so lighting contrast cancels out.
    for cell in histograms.chunks_exact_mut(ORIENTATION_BINS) {
        let norm = cell.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > NORM_EPSILON {
            for v in cell.iter_mut() {
                *v /= norm;
            }
        }
    }

    FeatureDescriptor::new(cells_y, cells_x * ORIENTATION_BINS, histograms)
}
