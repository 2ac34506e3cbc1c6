use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the inference pipeline.
///
/// Construction-time failures (`ModelLoad`, `NoModelsLoaded`) are fatal:
/// a pipeline object is never handed out after one of them. Shape errors
/// are recoverable and leave the pipeline state untouched. A frame with
/// no detectable face is not an error at all; it yields baseline
/// intensities instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input buffer must be H x W x 3 of 8-bit samples (got shape {shape:?})")]
    InvalidShape { shape: Vec<usize> },

    #[error("failed to load model from {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("no Action Unit models found")]
    NoModelsLoaded,

    #[error("inference stage failed: {0}")]
    Inference(String),
}
