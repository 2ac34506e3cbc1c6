//! Boundary adapter from externally supplied pixel buffers to [`Frame`].
//!
//! The input view's lifetime is not guaranteed to outlive the call, so
//! the adapter always copies into an owned frame.

use ndarray::ArrayViewD;

use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;

/// Validate and copy an H×W×3 8-bit buffer.
///
/// Anything other than exactly three dimensions with a final axis of 3
/// fails with [`PipelineError::InvalidShape`] and has no side effects.
pub fn frame_from_array(buffer: ArrayViewD<'_, u8>) -> Result<Frame, PipelineError> {
    let shape = buffer.shape();
    if buffer.ndim() != 3 || shape[2] != 3 {
        return Err(PipelineError::InvalidShape {
            shape: shape.to_vec(),
        });
    }
    let height = shape[0];
    let width = shape[1];

    let data = match buffer.as_slice() {
        Some(slice) => slice.to_vec(),
        // Non-contiguous views (e.g. negative strides) copy element-wise.
        None => buffer.iter().copied().collect(),
    };
    Ok(Frame::new(data, width as u32, height as u32))
}

/// Slice-based variant for callers without an ndarray view at hand.
pub fn frame_from_raw(
    data: &[u8],
    height: usize,
    width: usize,
    channels: usize,
) -> Result<Frame, PipelineError> {
    if channels != 3 || data.len() != height * width * channels {
        return Err(PipelineError::InvalidShape {
            shape: vec![height, width, channels],
        });
    }
    Ok(Frame::new(data.to_vec(), width as u32, height as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, Array4, s};

    #[test]
    fn test_valid_buffer_copies_pixels() {
        let mut arr = Array3::<u8>::zeros((2, 2, 3));
        arr[[1, 0, 0]] = 200;
        let frame = frame_from_array(arr.view().into_dyn()).unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.as_ndarray()[[1, 0, 0]], 200);
    }

    #[test]
    fn test_two_dim_buffer_rejected() {
        let arr = Array2::<u8>::zeros((10, 10));
        let err = frame_from_array(arr.view().into_dyn()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidShape { ref shape } if shape == &[10, 10]));
    }

    #[test]
    fn test_four_dim_buffer_rejected() {
        let arr = Array4::<u8>::zeros((1, 10, 10, 3));
        assert!(matches!(
            frame_from_array(arr.view().into_dyn()),
            Err(PipelineError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_four_channel_buffer_rejected() {
        let arr = Array3::<u8>::zeros((10, 10, 4));
        assert!(matches!(
            frame_from_array(arr.view().into_dyn()),
            Err(PipelineError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_zero_sized_buffer_is_accepted() {
        // An empty frame stages fine; inference just skips it.
        let arr = Array3::<u8>::zeros((0, 0, 3));
        let frame = frame_from_array(arr.view().into_dyn()).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_non_contiguous_view_copies_correctly() {
        let mut arr = Array3::<u8>::zeros((2, 2, 3));
        arr[[0, 0, 0]] = 10;
        arr[[1, 0, 0]] = 20;
        // Flip rows: the view is no longer standard-layout.
        let flipped = arr.slice(s![..;-1, .., ..]);
        let frame = frame_from_array(flipped.into_dyn()).unwrap();
        assert_eq!(frame.as_ndarray()[[0, 0, 0]], 20);
        assert_eq!(frame.as_ndarray()[[1, 0, 0]], 10);
    }

    #[test]
    fn test_frame_from_raw_valid() {
        let data = vec![7u8; 2 * 3 * 3];
        let frame = frame_from_raw(&data, 2, 3, 3).unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.width(), 3);
    }

    #[test]
    fn test_frame_from_raw_wrong_channels() {
        let data = vec![0u8; 2 * 2 * 4];
        assert!(matches!(
            frame_from_raw(&data, 2, 2, 4),
            Err(PipelineError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_frame_from_raw_length_mismatch() {
        let data = vec![0u8; 10];
        assert!(matches!(
            frame_from_raw(&data, 2, 2, 3),
            Err(PipelineError::InvalidShape { .. })
        ));
    }
}
