//! Wires the shipping tracker and analyzer into a ready pipeline.

use std::path::{Path, PathBuf};

use crate::analysis::domain::face_analyzer::FaceAnalyzer;
use crate::analysis::infrastructure::hog_au_analyzer::HogAuAnalyzer;
use crate::detection::infrastructure::onnx_landmark_tracker::OnnxLandmarkTracker;
use crate::pipeline::au_pipeline::AuPipeline;
use crate::shared::constants::{AU_MANIFEST_NAME, FACE_DETECTOR_MODEL_NAME, LANDMARK_MODEL_NAME};
use crate::shared::error::PipelineError;

/// Locations of the three model files backing a pipeline.
#[derive(Clone, Debug)]
pub struct ModelPaths {
    pub face_detector: PathBuf,
    pub landmark_model: PathBuf,
    pub au_manifest: PathBuf,
}

impl ModelPaths {
    /// The standard file names under a single models directory.
    pub fn in_dir(models_path: &Path) -> Self {
        Self {
            face_detector: models_path.join(FACE_DETECTOR_MODEL_NAME),
            landmark_model: models_path.join(LANDMARK_MODEL_NAME),
            au_manifest: models_path.join(AU_MANIFEST_NAME),
        }
    }
}

/// Build a pipeline from a directory holding the model files.
///
/// Fails with [`PipelineError::ModelLoad`] when any file is missing or
/// unreadable and with [`PipelineError::NoModelsLoaded`] when the AU
/// manifest configures zero classes. No pipeline object exists after a
/// failure, so a half-loaded state cannot be observed.
pub fn create_pipeline(models_path: &Path) -> Result<AuPipeline, PipelineError> {
    create_pipeline_from_paths(&ModelPaths::in_dir(models_path))
}

/// Same as [`create_pipeline`] but with each model file named
/// individually, for callers that resolve files elsewhere (cache
/// directories, downloads).
pub fn create_pipeline_from_paths(paths: &ModelPaths) -> Result<AuPipeline, PipelineError> {
    // The manifest is validated first: an empty AU set must surface even
    // when the ONNX models are also absent.
    let analyzer = HogAuAnalyzer::new(&paths.au_manifest)?;
    let tracker = OnnxLandmarkTracker::new(&paths.face_detector, &paths.landmark_model)?;
    log::info!(
        "pipeline ready with {} Action Unit models",
        analyzer.au_names().len()
    );
    Ok(AuPipeline::new(Box::new(tracker), Box::new(analyzer)))
}
