/// Landmark tracking session backed by two ONNX Runtime models: a
/// BlazeFace-style face detector for (re)acquisition and a 68-point
/// landmark regressor run on a grayscale face crop.
///
/// Tracking reuses the previous frame's landmarks: the regressor is run
/// directly on a region around them, and only falls back to full
/// detection when its confidence drops. This is what makes the session
/// stateful and why it must be reset between independent requests.
use std::path::Path;

use crate::detection::domain::landmark_set::LandmarkSet;
use crate::detection::domain::landmark_tracker::{LandmarkObservation, LandmarkTracker};
use crate::shared::error::PipelineError;
use crate::shared::frame::{Frame, GrayFrame};

/// Face detector input resolution (BlazeFace short-range).
const DETECTOR_INPUT_SIZE: u32 = 128;

/// Landmark regressor input resolution.
const LANDMARK_INPUT_SIZE: u32 = 112;

/// Number of detector anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Minimum detector score for a face to count as found.
const DETECTION_CONFIDENCE: f32 = 0.5;

/// Below this regressor confidence a tracked estimate is abandoned and
/// full detection runs instead.
const TRACK_CONFIDENCE: f32 = 0.4;

/// How far the regression region extends beyond the landmark bounding box.
const ROI_EXPANSION: f64 = 1.4;

pub struct OnnxLandmarkTracker {
    detector: ort::session::Session,
    regressor: ort::session::Session,
    anchors: Vec<[f32; 2]>,
    last_landmarks: Option<LandmarkSet>,
}

impl OnnxLandmarkTracker {
    /// Load both models. Failure here is fatal for pipeline construction;
    /// per-frame calls never re-attempt loading.
    pub fn new(detector_path: &Path, regressor_path: &Path) -> Result<Self, PipelineError> {
        let detector = load_session(detector_path)?;
        let regressor = load_session(regressor_path)?;
        Ok(Self {
            detector,
            regressor,
            anchors: generate_anchors(),
            last_landmarks: None,
        })
    }

    /// Highest-confidence face box in frame coordinates, if any.
    fn detect_face(&mut self, frame: &Frame) -> Result<Option<[f64; 4]>, Box<dyn std::error::Error>> {
        let input = rgb_to_tensor(frame, DETECTOR_INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.detector.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(format!(
                "face detector expected 2 outputs, got {}",
                outputs.len()
            )
            .into());
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("cannot read regressor output")?;
        let score_data = scores.as_slice().ok_or("cannot read score output")?;

        Ok(best_face(
            reg_data,
            score_data,
            &self.anchors,
            frame.width(),
            frame.height(),
        ))
    }

    /// Run the landmark regressor on a region of the grayscale frame.
    fn regress_landmarks(
        &mut self,
        gray: &GrayFrame,
        roi: [f64; 4],
    ) -> Result<(LandmarkSet, f32), Box<dyn std::error::Error>> {
        let input = gray_roi_to_tensor(gray, roi, LANDMARK_INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.regressor.run(ort::inputs![input_value])?;

        // landmarks: [1, 136] in normalized crop coordinates, score: [1, 1]
        if outputs.len() < 2 {
            return Err(format!(
                "landmark regressor expected 2 outputs, got {}",
                outputs.len()
            )
            .into());
        }
        let coords = outputs[0].try_extract_array::<f32>()?;
        let score = outputs[1].try_extract_array::<f32>()?;
        let coord_data = coords.as_slice().ok_or("cannot read landmark output")?;
        let score_data = score.as_slice().ok_or("cannot read confidence output")?;

        let landmarks = landmarks_from_crop(coord_data, roi);
        let confidence = sigmoid(*score_data.first().ok_or("empty confidence output")?);
        Ok((landmarks, confidence))
    }
}

impl LandmarkTracker for OnnxLandmarkTracker {
    fn detect_or_track(
        &mut self,
        frame: &Frame,
        gray: &GrayFrame,
    ) -> Result<LandmarkObservation, Box<dyn std::error::Error>> {
        // Track first: regress directly around the previous estimate.
        let prev_roi = self
            .last_landmarks
            .as_ref()
            .and_then(|l| l.bounding_box())
            .map(|b| expand_roi(b, ROI_EXPANSION, frame.width(), frame.height()));

        if let Some(roi) = prev_roi {
            let (landmarks, confidence) = self.regress_landmarks(gray, roi)?;
            if confidence >= TRACK_CONFIDENCE {
                self.last_landmarks = Some(landmarks.clone());
                return Ok(LandmarkObservation {
                    landmarks,
                    success: true,
                });
            }
            log::debug!("track confidence {confidence:.2} too low, re-detecting");
        }

        // Full detection.
        match self.detect_face(frame)? {
            Some(bbox) => {
                let roi = expand_roi(bbox, ROI_EXPANSION, frame.width(), frame.height());
                let (landmarks, confidence) = self.regress_landmarks(gray, roi)?;
                let success = confidence >= TRACK_CONFIDENCE;
                if success {
                    self.last_landmarks = Some(landmarks.clone());
                }
                Ok(LandmarkObservation { landmarks, success })
            }
            None => {
                // No face this frame: report the stale estimate, flagged.
                let landmarks = self.last_landmarks.clone().unwrap_or_else(LandmarkSet::empty);
                Ok(LandmarkObservation {
                    landmarks,
                    success: false,
                })
            }
        }
    }

    fn reset(&mut self) {
        self.last_landmarks = None;
    }
}

fn load_session(path: &Path) -> Result<ort::session::Session, PipelineError> {
    ort::session::Session::builder()
        .and_then(|mut b| b.commit_from_file(path))
        .map_err(|e| PipelineError::ModelLoad {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Nearest-neighbor resize to `size × size`, normalized to [0,1] NCHW.
fn rgb_to_tensor(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    if src_h == 0 || src_w == 0 {
        return tensor;
    }

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Sample a grayscale region into a `size × size` [0,1] NCHW tensor.
/// Coordinates outside the image clamp to the nearest edge pixel.
fn gray_roi_to_tensor(gray: &GrayFrame, roi: [f64; 4], size: u32) -> ndarray::Array4<f32> {
    let s = size as usize;
    let [x0, y0, x1, y1] = roi;
    let roi_w = x1 - x0;
    let roi_h = y1 - y0;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 1, s, s));
    if gray.is_empty() || roi_w <= 0.0 || roi_h <= 0.0 {
        return tensor;
    }

    for y in 0..s {
        let src_y = y0 + (y as f64 + 0.5) * roi_h / s as f64;
        for x in 0..s {
            let src_x = x0 + (x as f64 + 0.5) * roi_w / s as f64;
            let v = gray.sample_clamped(src_y as i64, src_x as i64);
            tensor[[0, 0, y, x]] = v as f32 / 255.0;
        }
    }

    tensor
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode anchor-relative detector outputs and keep the single best box
/// above [`DETECTION_CONFIDENCE`], in frame coordinates.
fn best_face(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    frame_w: u32,
    frame_h: u32,
) -> Option<[f64; 4]> {
    let mut best: Option<([f64; 4], f32)> = None;
    let count = anchors.len().min(score_data.len()).min(NUM_ANCHORS);

    for i in 0..count {
        let score = sigmoid(score_data[i]);
        if score < DETECTION_CONFIDENCE {
            continue;
        }
        if best.as_ref().is_some_and(|(_, s)| *s >= score) {
            continue;
        }

        let reg = i * 16;
        if reg + 4 > reg_data.len() {
            break;
        }
        let anchor = &anchors[i];
        let cx = anchor[0] + reg_data[reg] / DETECTOR_INPUT_SIZE as f32;
        let cy = anchor[1] + reg_data[reg + 1] / DETECTOR_INPUT_SIZE as f32;
        let w = reg_data[reg + 2] / DETECTOR_INPUT_SIZE as f32;
        let h = reg_data[reg + 3] / DETECTOR_INPUT_SIZE as f32;

        let x0 = ((cx - w / 2.0) * frame_w as f32).max(0.0) as f64;
        let y0 = ((cy - h / 2.0) * frame_h as f32).max(0.0) as f64;
        let x1 = ((cx + w / 2.0) * frame_w as f32).min(frame_w as f32) as f64;
        let y1 = ((cy + h / 2.0) * frame_h as f32).min(frame_h as f32) as f64;
        if x1 > x0 && y1 > y0 {
            best = Some(([x0, y0, x1, y1], score));
        }
    }

    best.map(|(bbox, _)| bbox)
}

/// Map normalized crop-space landmark pairs back into frame coordinates.
fn landmarks_from_crop(coord_data: &[f32], roi: [f64; 4]) -> LandmarkSet {
    let [x0, y0, x1, y1] = roi;
    let roi_w = x1 - x0;
    let roi_h = y1 - y0;

    let points = coord_data
        .chunks_exact(2)
        .map(|p| (x0 + p[0] as f64 * roi_w, y0 + p[1] as f64 * roi_h))
        .collect();
    LandmarkSet::new(points)
}

/// Grow a bounding box around its center, clamped to the frame.
fn expand_roi(bbox: [f64; 4], factor: f64, frame_w: u32, frame_h: u32) -> [f64; 4] {
    let cx = (bbox[0] + bbox[2]) / 2.0;
    let cy = (bbox[1] + bbox[3]) / 2.0;
    // Square region so the crop keeps its aspect ratio.
    let half = (bbox[2] - bbox[0]).max(bbox[3] - bbox[1]) * factor / 2.0;

    [
        (cx - half).max(0.0),
        (cy - half).max(0.0),
        (cx + half).min(frame_w as f64),
        (cy + half).min(frame_h as f64),
    ]
}

/// Anchor grid for the short-range detector: 16×16 and 8×8 feature maps
/// with 2 and 6 anchors per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, per_cell) in &strides {
        let grid = DETECTOR_INPUT_SIZE as usize / stride;
        for y in 0..grid {
            for x in 0..grid {
                let cx = (x as f32 + 0.5) / grid as f32;
                let cy = (y as f32 + 0.5) / grid as f32;
                for _ in 0..per_cell {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_generate_anchors_count() {
        // 16×16 grid × 2 anchors + 8×8 grid × 6 anchors = 512 + 384 = 896
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in generate_anchors() {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_rgb_tensor_shape_and_normalization() {
        let frame = Frame::new(vec![255u8; 64 * 32 * 3], 64, 32);
        let tensor = rgb_to_tensor(&frame, 128);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 1.0, epsilon = 0.01);
    }

    #[test]
    fn test_rgb_tensor_empty_frame_is_zeros() {
        let frame = Frame::new(Vec::new(), 0, 0);
        let tensor = rgb_to_tensor(&frame, 128);
        assert!(tensor.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_gray_roi_tensor_uniform_region() {
        let gray = GrayFrame::new(vec![128u8; 40 * 40], 40, 40);
        let tensor = gray_roi_to_tensor(&gray, [10.0, 10.0, 30.0, 30.0], 112);
        assert_eq!(tensor.shape(), &[1, 1, 112, 112]);
        assert_relative_eq!(tensor[[0, 0, 56, 56]], 128.0 / 255.0, epsilon = 1e-6);
    }

    #[test]
    fn test_gray_roi_tensor_degenerate_roi_is_zeros() {
        let gray = GrayFrame::new(vec![200u8; 16], 4, 4);
        let tensor = gray_roi_to_tensor(&gray, [2.0, 2.0, 2.0, 2.0], 8);
        assert!(tensor.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_expand_roi_grows_around_center() {
        let roi = expand_roi([40.0, 40.0, 60.0, 60.0], 2.0, 200, 200);
        assert_eq!(roi, [30.0, 30.0, 70.0, 70.0]);
    }

    #[test]
    fn test_expand_roi_clamps_to_frame() {
        let roi = expand_roi([0.0, 0.0, 50.0, 50.0], 2.0, 60, 60);
        assert_eq!(roi[0], 0.0);
        assert_eq!(roi[1], 0.0);
        assert_eq!(roi[2], 60.0);
        assert_eq!(roi[3], 60.0);
    }

    #[test]
    fn test_expand_roi_squares_tall_boxes() {
        let roi = expand_roi([50.0, 20.0, 70.0, 80.0], 1.0, 500, 500);
        assert_relative_eq!(roi[2] - roi[0], roi[3] - roi[1]);
    }

    #[test]
    fn test_landmarks_from_crop_maps_to_frame() {
        // Two normalized points: crop center and crop origin.
        let coords = [0.5f32, 0.5, 0.0, 0.0];
        let set = landmarks_from_crop(&coords, [100.0, 200.0, 150.0, 300.0]);
        assert_eq!(set.len(), 2);
        assert_relative_eq!(set.points()[0].0, 125.0);
        assert_relative_eq!(set.points()[0].1, 250.0);
        assert_relative_eq!(set.points()[1].0, 100.0);
        assert_relative_eq!(set.points()[1].1, 200.0);
    }

    #[test]
    fn test_best_face_none_below_threshold() {
        let anchors = generate_anchors();
        let scores = vec![-10.0f32; anchors.len()]; // sigmoid ≈ 0
        let regs = vec![0.0f32; anchors.len() * 16];
        assert!(best_face(&regs, &scores, &anchors, 100, 100).is_none());
    }

    #[test]
    fn test_best_face_picks_highest_score() {
        let anchors = generate_anchors();
        let mut scores = vec![-10.0f32; anchors.len()];
        scores[10] = 1.0;
        scores[20] = 3.0; // winner
        let mut regs = vec![0.0f32; anchors.len() * 16];
        // Give both candidates a 32px-wide box at their anchor.
        for i in [10usize, 20] {
            regs[i * 16 + 2] = 32.0;
            regs[i * 16 + 3] = 32.0;
        }
        let bbox = best_face(&regs, &scores, &anchors, 128, 128).unwrap();
        let expected_cx = anchors[20][0] as f64 * 128.0;
        assert_relative_eq!((bbox[0] + bbox[2]) / 2.0, expected_cx, epsilon = 0.5);
    }

    #[test]
    fn test_sigmoid_midpoint() {
        assert_relative_eq!(sigmoid(0.0), 0.5, epsilon = 1e-6);
    }
}
