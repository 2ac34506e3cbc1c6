//! Similarity-transform face alignment.
//!
//! Warps the detected face into a canonical pose and scale so the
//! appearance descriptor is comparable across frames. The canonical
//! positions are the standard five-point 112×112 template; denser
//! landmark layouts are reduced to those five anchors first.

use crate::detection::domain::landmark_set::LandmarkSet;
use crate::shared::frame::Frame;

/// Canonical anchor positions in a 112×112 crop:
/// left eye, right eye, nose tip, left mouth corner, right mouth corner.
const TEMPLATE_112: [(f64, f64); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// Indices of the 68-point layout contributing to each anchor.
const LEFT_EYE_RANGE: std::ops::Range<usize> = 36..42;
const RIGHT_EYE_RANGE: std::ops::Range<usize> = 42..48;
const NOSE_TIP: usize = 30;
const MOUTH_LEFT: usize = 48;
const MOUTH_RIGHT: usize = 54;

/// Non-reflective 2-D similarity: `u = a*x - b*y + tx`, `v = b*x + a*y + ty`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Similarity {
    pub a: f64,
    pub b: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Similarity {
    pub fn apply(&self, p: (f64, f64)) -> (f64, f64) {
        (
            self.a * p.0 - self.b * p.1 + self.tx,
            self.b * p.0 + self.a * p.1 + self.ty,
        )
    }

    /// Inverse transform; `None` when the scale is degenerate.
    pub fn inverse(&self) -> Option<Similarity> {
        let scale_sq = self.a * self.a + self.b * self.b;
        if scale_sq <= f64::EPSILON {
            return None;
        }
        let ia = self.a / scale_sq;
        let ib = -self.b / scale_sq;
        Some(Similarity {
            a: ia,
            b: ib,
            tx: -(ia * self.tx - ib * self.ty),
            ty: -(ib * self.tx + ia * self.ty),
        })
    }
}

/// Least-squares similarity mapping `src` onto `dst`.
///
/// Closed form over centered coordinates; `None` when fewer than two
/// points are given or the source points are coincident.
pub fn similarity_from_points(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<Similarity> {
    if src.len() < 2 || src.len() != dst.len() {
        return None;
    }
    let n = src.len() as f64;
    let (mx, my) = src
        .iter()
        .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
    let (mu, mv) = dst
        .iter()
        .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
    let (mx, my, mu, mv) = (mx / n, my / n, mu / n, mv / n);

    let mut num_a = 0.0;
    let mut num_b = 0.0;
    let mut denom = 0.0;
    for ((x, y), (u, v)) in src.iter().zip(dst) {
        let (xc, yc) = (x - mx, y - my);
        let (uc, vc) = (u - mu, v - mv);
        num_a += xc * uc + yc * vc;
        num_b += xc * vc - yc * uc;
        denom += xc * xc + yc * yc;
    }
    if denom <= f64::EPSILON {
        return None;
    }

    let a = num_a / denom;
    let b = num_b / denom;
    Some(Similarity {
        a,
        b,
        tx: mu - a * mx + b * my,
        ty: mv - b * mx - a * my,
    })
}

/// Reduce a landmark set to the five alignment anchors.
///
/// A 68-point layout is averaged per anchor; a five-point set is taken
/// as-is. Anything sparser cannot anchor an alignment.
pub fn alignment_anchors(landmarks: &LandmarkSet) -> Option<[(f64, f64); 5]> {
    if landmarks.len() >= 68 {
        let points = landmarks.points();
        Some([
            landmarks.mean_of(LEFT_EYE_RANGE)?,
            landmarks.mean_of(RIGHT_EYE_RANGE)?,
            points[NOSE_TIP],
            points[MOUTH_LEFT],
            points[MOUTH_RIGHT],
        ])
    } else if landmarks.len() == 5 {
        let p = landmarks.points();
        Some([p[0], p[1], p[2], p[3], p[4]])
    } else {
        None
    }
}

/// Warp the face region into a `size × size` canonical crop.
///
/// Returns `None` when the landmark set cannot anchor an alignment or
/// the fitted transform is degenerate.
pub fn align_face(frame: &Frame, landmarks: &LandmarkSet, size: u32) -> Option<Frame> {
    if frame.is_empty() {
        return None;
    }
    let anchors = alignment_anchors(landmarks)?;

    let scale = size as f64 / 112.0;
    let template: Vec<(f64, f64)> = TEMPLATE_112
        .iter()
        .map(|(x, y)| (x * scale, y * scale))
        .collect();

    let forward = similarity_from_points(&anchors, &template)?;
    let back = forward.inverse()?;

    let s = size as usize;
    let mut data = Vec::with_capacity(s * s * 3);
    for y in 0..s {
        for x in 0..s {
            let (sx, sy) = back.apply((x as f64, y as f64));
            let px = sample_bilinear(frame, sx, sy);
            data.extend_from_slice(&px);
        }
    }
    Some(Frame::new(data, size, size))
}

/// Bilinear RGB sample with clamp-to-edge addressing.
fn sample_bilinear(frame: &Frame, x: f64, y: f64) -> [u8; 3] {
    let w = frame.width() as i64;
    let h = frame.height() as i64;
    let data = frame.data();

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let idx = |yy: i64, xx: i64| -> usize {
        let cy = yy.clamp(0, h - 1) as usize;
        let cx = xx.clamp(0, w - 1) as usize;
        (cy * w as usize + cx) * 3
    };

    let p00 = idx(y0, x0);
    let p01 = idx(y0, x0 + 1);
    let p10 = idx(y0 + 1, x0);
    let p11 = idx(y0 + 1, x0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = data[p00 + c] as f64 * (1.0 - fx) + data[p01 + c] as f64 * fx;
        let bottom = data[p10 + c] as f64 * (1.0 - fx) + data[p11 + c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round() as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn five_points() -> Vec<(f64, f64)> {
        vec![
            (30.0, 40.0),
            (70.0, 40.0),
            (50.0, 60.0),
            (35.0, 80.0),
            (65.0, 80.0),
        ]
    }

    #[test]
    fn test_similarity_identity() {
        let pts = five_points();
        let t = similarity_from_points(&pts, &pts).unwrap();
        assert_relative_eq!(t.a, 1.0, epsilon = 1e-9);
        assert_relative_eq!(t.b, 0.0, epsilon = 1e-9);
        assert_relative_eq!(t.tx, 0.0, epsilon = 1e-9);
        assert_relative_eq!(t.ty, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_similarity_translation() {
        let src = five_points();
        let dst: Vec<_> = src.iter().map(|(x, y)| (x + 5.0, y - 3.0)).collect();
        let t = similarity_from_points(&src, &dst).unwrap();
        let (u, v) = t.apply(src[2]);
        assert_relative_eq!(u, dst[2].0, epsilon = 1e-9);
        assert_relative_eq!(v, dst[2].1, epsilon = 1e-9);
    }

    #[test]
    fn test_similarity_rotation_90() {
        let src = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        let dst: Vec<_> = src.iter().map(|(x, y)| (-y, *x)).collect();
        let t = similarity_from_points(&src, &dst).unwrap();
        let (u, v) = t.apply((1.0, 0.0));
        assert_relative_eq!(u, 0.0, epsilon = 1e-9);
        assert_relative_eq!(v, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_similarity_degenerate_source() {
        let src = vec![(2.0, 2.0), (2.0, 2.0)];
        let dst = vec![(0.0, 0.0), (1.0, 1.0)];
        assert!(similarity_from_points(&src, &dst).is_none());
    }

    #[test]
    fn test_inverse_round_trips() {
        let src = five_points();
        let dst: Vec<_> = src.iter().map(|(x, y)| (1.5 * x + 2.0, 1.5 * y - 4.0)).collect();
        let t = similarity_from_points(&src, &dst).unwrap();
        let inv = t.inverse().unwrap();
        let p = (12.0, 34.0);
        let round = inv.apply(t.apply(p));
        assert_relative_eq!(round.0, p.0, epsilon = 1e-9);
        assert_relative_eq!(round.1, p.1, epsilon = 1e-9);
    }

    #[test]
    fn test_anchors_from_five_points() {
        let set = LandmarkSet::new(five_points());
        let anchors = alignment_anchors(&set).unwrap();
        assert_eq!(anchors[0], (30.0, 40.0));
        assert_eq!(anchors[4], (65.0, 80.0));
    }

    #[test]
    fn test_anchors_from_68_points() {
        let mut points = vec![(0.0, 0.0); 68];
        for p in &mut points[36..42] {
            *p = (30.0, 40.0); // left eye ring
        }
        for p in &mut points[42..48] {
            *p = (70.0, 40.0); // right eye ring
        }
        points[30] = (50.0, 60.0);
        points[48] = (35.0, 80.0);
        points[54] = (65.0, 80.0);

        let set = LandmarkSet::new(points);
        let anchors = alignment_anchors(&set).unwrap();
        assert_eq!(anchors[0], (30.0, 40.0));
        assert_eq!(anchors[1], (70.0, 40.0));
        assert_eq!(anchors[2], (50.0, 60.0));
    }

    #[test]
    fn test_anchors_sparse_set_is_none() {
        let set = LandmarkSet::new(vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert!(alignment_anchors(&set).is_none());
    }

    #[test]
    fn test_align_face_dimensions() {
        let frame = Frame::new(vec![90u8; 100 * 100 * 3], 100, 100);
        let set = LandmarkSet::new(five_points());
        let aligned = align_face(&frame, &set, 112).unwrap();
        assert_eq!(aligned.width(), 112);
        assert_eq!(aligned.height(), 112);
    }

    #[test]
    fn test_align_face_uniform_source_stays_uniform() {
        let frame = Frame::new(vec![90u8; 100 * 100 * 3], 100, 100);
        let set = LandmarkSet::new(five_points());
        let aligned = align_face(&frame, &set, 112).unwrap();
        assert!(aligned.data().iter().all(|&v| v == 90));
    }

    #[test]
    fn test_align_face_empty_landmarks_is_none() {
        let frame = Frame::new(vec![0u8; 100 * 100 * 3], 100, 100);
        assert!(align_face(&frame, &LandmarkSet::empty(), 112).is_none());
    }

    #[test]
    fn test_align_face_empty_frame_is_none() {
        let frame = Frame::new(Vec::new(), 0, 0);
        let set = LandmarkSet::new(five_points());
        assert!(align_face(&frame, &set, 112).is_none());
    }

    #[test]
    fn test_sample_bilinear_center_of_pixel() {
        // 2x1 frame: left pixel 0, right pixel 100 (all channels)
        let frame = Frame::new(vec![0, 0, 0, 100, 100, 100], 2, 1);
        let mid = sample_bilinear(&frame, 0.5, 0.0);
        assert_eq!(mid, [50, 50, 50]);
    }
}
