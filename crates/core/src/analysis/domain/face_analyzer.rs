use std::collections::HashMap;

use crate::analysis::domain::descriptor::FeatureDescriptor;
use crate::detection::domain::landmark_set::LandmarkSet;
use crate::shared::frame::Frame;

/// Mapping from Action Unit identifier to predicted intensity.
/// Keys are unique; insertion order carries no meaning.
pub type AuResult = HashMap<String, f64>;

/// Domain interface for the face analysis session: alignment, appearance
/// features, and Action Unit prediction over an accumulating state.
///
/// Implementations are stateful across the frames of one request and are
/// returned to a clean slate with [`FaceAnalyzer::reset`].
pub trait FaceAnalyzer: Send {
    /// Feed one frame's appearance into the running model.
    ///
    /// `timestamp` is monotonic; passing 0.0 on every call is acceptable
    /// for single-shot use and disables temporal normalization.
    /// `is_static_image` additionally disables the person-specific
    /// appearance baseline, which needs more than one frame to mean
    /// anything.
    fn ingest(
        &mut self,
        frame: &Frame,
        landmarks: &LandmarkSet,
        success: bool,
        timestamp: f64,
        is_static_image: bool,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Most recent similarity-warped face crop. `None` until the first
    /// successful `ingest` since the last `reset`.
    fn aligned_face(&self) -> Option<&Frame>;

    /// Most recent appearance descriptor, under the same precondition as
    /// [`FaceAnalyzer::aligned_face`].
    fn descriptor(&self) -> Option<&FeatureDescriptor>;

    /// Predict intensities for every configured Action Unit from the
    /// currently accumulated state. Does not reset; calling this again
    /// without an intervening `ingest` returns the same values.
    fn finalize_predictions(&mut self) -> AuResult;

    /// The configured Action Unit identifiers, fixed for the session's
    /// lifetime. Guaranteed non-empty for any successfully constructed
    /// session.
    fn au_names(&self) -> &[String];

    /// Clear all accumulated appearance state.
    fn reset(&mut self);
}
