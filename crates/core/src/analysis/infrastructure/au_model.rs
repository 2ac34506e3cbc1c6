//! Linear Action Unit intensity models, loaded from a JSON manifest.
//!
//! Each entry is one regressor: a weight vector over the appearance
//! descriptor plus a bias. Predictions are clamped to the FACS 0-5
//! intensity scale.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::shared::constants::{AU_INTENSITY_MAX, AU_INTENSITY_MIN};
use crate::shared::error::PipelineError;

#[derive(Debug, Deserialize)]
struct AuManifest {
    aus: Vec<AuModel>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AuModel {
    pub name: String,
    pub bias: f64,
    pub weights: Vec<f64>,
}

impl AuModel {
    /// Linear response over the feature vector, clamped to the intensity
    /// scale. The caller guarantees `features.len() == weights.len()`.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let dot: f64 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, f)| w * f)
            .sum();
        (dot + self.bias).clamp(AU_INTENSITY_MIN, AU_INTENSITY_MAX)
    }
}

/// Load and validate the AU model manifest.
///
/// An empty manifest is fatal: a session with zero Action Unit classes
/// must never be handed out.
pub fn load_manifest(path: &Path) -> Result<Vec<AuModel>, PipelineError> {
    let text = fs::read_to_string(path).map_err(|e| PipelineError::ModelLoad {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    let manifest: AuManifest =
        serde_json::from_str(&text).map_err(|e| PipelineError::ModelLoad {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

    if manifest.aus.is_empty() {
        return Err(PipelineError::NoModelsLoaded);
    }

    let mut seen = HashSet::new();
    for model in &manifest.aus {
        if !seen.insert(model.name.as_str()) {
            return Err(PipelineError::ModelLoad {
                path: path.to_path_buf(),
                source: format!("duplicate Action Unit name {:?}", model.name).into(),
            });
        }
    }

    Ok(manifest.aus)
}
