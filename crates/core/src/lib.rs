//! Facial Action Unit inference from single color frames.
//!
//! One call to [`AuPipeline::infer`] runs the whole per-frame sequence
//! (buffer validation, grayscale conversion, landmark detection and
//! tracking, face alignment, appearance features, AU regression) and
//! returns a mapping from Action Unit name to intensity. Sessions are
//! reset when a result is taken, so consecutive calls are independent
//! requests.

pub mod analysis;
pub mod detection;
pub mod pipeline;
pub mod shared;

pub use analysis::domain::face_analyzer::AuResult;
pub use pipeline::au_pipeline::AuPipeline;
pub use pipeline::factory::{create_pipeline, create_pipeline_from_paths, ModelPaths};
pub use shared::error::PipelineError;
