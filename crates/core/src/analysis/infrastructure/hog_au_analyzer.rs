use std::path::Path;

use crate::analysis::domain::descriptor::FeatureDescriptor;
use crate::analysis::domain::face_analyzer::{AuResult, FaceAnalyzer};
use crate::analysis::infrastructure::au_model::{self, AuModel};
use crate::analysis::infrastructure::face_aligner;
use crate::analysis::infrastructure::hog;
use crate::detection::domain::landmark_set::LandmarkSet;
use crate::shared::constants::{ALIGNED_FACE_SIZE, AU_INTENSITY_MIN};
use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;
use crate::shared::grayscale::to_grayscale;

/// Analysis session: similarity alignment, HOG appearance descriptor,
/// and linear Action Unit regressors.
///
/// Alignment and the descriptor are computed eagerly during `ingest`, so
/// the accessors are pure reads. The person-specific baseline is a
/// running mean of the descriptors seen since the last reset; with a
/// single frame (or `is_static_image`) predictions fall back to the raw
/// descriptor.
pub struct HogAuAnalyzer {
    models: Vec<AuModel>,
    names: Vec<String>,
    aligned: Option<Frame>,
    descriptor: Option<FeatureDescriptor>,
    /// Person-normalized prediction input for the last usable frame.
    features: Option<Vec<f64>>,
    descriptor_sum: Vec<f64>,
    frames_seen: usize,
}

impl HogAuAnalyzer {
    /// Load the AU manifest and validate every regressor against the
    /// descriptor layout. Fatal on an empty manifest or a dimension
    /// mismatch; a half-configured session is never handed out.
    pub fn new(manifest_path: &Path) -> Result<Self, PipelineError> {
        let models = au_model::load_manifest(manifest_path)?;

        let expected = hog::descriptor_len(ALIGNED_FACE_SIZE);
        for model in &models {
            if model.weights.len() != expected {
                return Err(PipelineError::ModelLoad {
                    path: manifest_path.to_path_buf(),
                    source: format!(
                        "{} expects {} weights, manifest has {}",
                        model.name,
                        expected,
                        model.weights.len()
                    )
                    .into(),
                });
            }
        }

        let names = models.iter().map(|m| m.name.clone()).collect();
        Ok(Self {
            models,
            names,
            aligned: None,
            descriptor: None,
            features: None,
            descriptor_sum: vec![0.0; expected],
            frames_seen: 0,
        })
    }

    fn record_miss(&mut self) {
        self.aligned = None;
        self.descriptor = None;
        self.features = None;
    }
}

impl FaceAnalyzer for HogAuAnalyzer {
    fn ingest(
        &mut self,
        frame: &Frame,
        landmarks: &LandmarkSet,
        success: bool,
        _timestamp: f64,
        is_static_image: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !success || landmarks.is_empty() {
            self.record_miss();
            return Ok(());
        }

        let Some(aligned) = face_aligner::align_face(frame, landmarks, ALIGNED_FACE_SIZE) else {
            // Too sparse to anchor an alignment: same treatment as a miss.
            self.record_miss();
            return Ok(());
        };

        let gray = to_grayscale(&aligned);
        let descriptor = hog::extract(&gray);
        let raw = descriptor.as_slice();

        // Baseline from the frames seen before this one.
        let features = if is_static_image || self.frames_seen == 0 {
            raw.to_vec()
        } else {
            let n = self.frames_seen as f64;
            raw.iter()
                .zip(&self.descriptor_sum)
                .map(|(v, sum)| v - sum / n)
                .collect()
        };

        for (sum, v) in self.descriptor_sum.iter_mut().zip(raw) {
            *sum += v;
        }
        self.frames_seen += 1;

        self.aligned = Some(aligned);
        self.descriptor = Some(descriptor);
        self.features = Some(features);
        Ok(())
    }

    fn aligned_face(&self) -> Option<&Frame> {
        self.aligned.as_ref()
    }

    fn descriptor(&self) -> Option<&FeatureDescriptor> {
        self.descriptor.as_ref()
    }

    fn finalize_predictions(&mut self) -> AuResult {
        let mut result = AuResult::with_capacity(self.models.len());
        match &self.features {
            Some(features) => {
                for model in &self.models {
                    result.insert(model.name.clone(), model.predict(features));
                }
            }
            // No usable face since the last reset: every configured AU
            // reports the baseline intensity.
            None => {
                for model in &self.models {
                    result.insert(model.name.clone(), AU_INTENSITY_MIN);
                }
            }
        }
        result
    }

    fn au_names(&self) -> &[String] {
        &self.names
    }

    fn reset(&mut self) {
        self.aligned = None;
        self.descriptor = None;
        self.features = None;
        self.descriptor_sum.fill(0.0);
        self.frames_seen = 0;
    }
}
