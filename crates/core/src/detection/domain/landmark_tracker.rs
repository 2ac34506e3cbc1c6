use crate::detection::domain::landmark_set::LandmarkSet;
use crate::shared::frame::{Frame, GrayFrame};

/// One frame's landmark estimate plus its quality flag.
///
/// `success == false` is a normal outcome on frames with no visible face,
/// never a hard error; the landmarks are then a best-effort (possibly
/// stale) estimate and may be empty.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkObservation {
    pub landmarks: LandmarkSet,
    pub success: bool,
}

/// Domain interface for stateful landmark detection and tracking.
///
/// Implementations carry prior-frame state to track rather than
/// re-detect, hence `&mut self`.
pub trait LandmarkTracker: Send {
    /// Detect or track landmarks in the given frame. The grayscale view is
    /// precomputed by the caller and has the same spatial dimensions.
    fn detect_or_track(
        &mut self,
        frame: &Frame,
        gray: &GrayFrame,
    ) -> Result<LandmarkObservation, Box<dyn std::error::Error>>;

    /// Discard all temporal priors, returning to the just-initialized
    /// state. Safe to call at any time, including before the first frame.
    fn reset(&mut self);
}
