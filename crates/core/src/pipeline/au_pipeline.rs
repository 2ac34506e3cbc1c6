use std::time::Instant;

use ndarray::ArrayViewD;

use crate::analysis::domain::face_analyzer::{AuResult, FaceAnalyzer};
use crate::detection::domain::landmark_tracker::LandmarkTracker;
use crate::pipeline::frame_adapter;
use crate::pipeline::pipeline_logger::{elapsed_ms, NullPipelineLogger, PipelineLogger};
use crate::shared::error::PipelineError;
use crate::shared::frame::{Frame, GrayFrame};
use crate::shared::grayscale::to_grayscale;

/// Orchestrator progress through one inference request.
enum State {
    /// No frame staged.
    Idle,
    /// Frame accepted and converted; inference not yet run.
    Staged { frame: Frame, gray: GrayFrame },
    /// Result computed and waiting to be taken.
    Inferred { result: AuResult },
}

/// Single-frame Action Unit inference pipeline.
///
/// Owns one tracking session and one analysis session for its entire
/// lifetime and drives the per-frame sequence: adapt → grayscale →
/// detect-or-track → ingest → predict. [`AuPipeline::take_result`]
/// resets both sessions, so every external request starts from a clean
/// slate even though the sessions are stateful within a request. This
/// reset-on-read behavior is a deliberate contract; callers relying on
/// cross-request tracking must drive the sessions directly instead.
///
/// All methods take `&mut self` and run to completion synchronously;
/// share a pipeline across threads only behind a `Mutex` held around the
/// whole `infer` sequence. Dropping the pipeline releases both sessions.
pub struct AuPipeline {
    tracker: Box<dyn LandmarkTracker>,
    analyzer: Box<dyn FaceAnalyzer>,
    logger: Box<dyn PipelineLogger>,
    state: State,
}

impl std::fmt::Debug for AuPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuPipeline").finish_non_exhaustive()
    }
}

impl AuPipeline {
    pub fn new(tracker: Box<dyn LandmarkTracker>, analyzer: Box<dyn FaceAnalyzer>) -> Self {
        Self {
            tracker,
            analyzer,
            logger: Box::new(NullPipelineLogger),
            state: State::Idle,
        }
    }

    /// Replace the stage-timing observer.
    pub fn set_logger(&mut self, logger: Box<dyn PipelineLogger>) {
        self.logger = logger;
    }

    /// The configured Action Unit identifiers; every result carries
    /// exactly these keys. Stable for the pipeline's lifetime.
    pub fn au_names(&self) -> &[String] {
        self.analyzer.au_names()
    }

    /// Accept an H×W×3 8-bit buffer and derive its grayscale view.
    ///
    /// On a shape error the previous state is preserved untouched and
    /// the error propagates; on success any previously staged frame or
    /// untaken result is replaced.
    pub fn stage_frame(&mut self, buffer: ArrayViewD<'_, u8>) -> Result<(), PipelineError> {
        let started = Instant::now();
        let frame = frame_adapter::frame_from_array(buffer)?;
        let gray = to_grayscale(&frame);
        self.logger.timing("stage", elapsed_ms(started));

        self.state = State::Staged { frame, gray };
        Ok(())
    }

    /// Run the full analysis sequence over the staged frame.
    ///
    /// A silent no-op when nothing is staged (or the staged frame is
    /// zero-sized): detection only runs when a frame is present. Neither
    /// session is touched in that case and the current state is kept.
    pub fn run_inference(&mut self) -> Result<(), PipelineError> {
        let (frame, gray) = match std::mem::replace(&mut self.state, State::Idle) {
            State::Staged { frame, gray } if !frame.is_empty() => (frame, gray),
            other => {
                self.state = other;
                return Ok(());
            }
        };

        let started = Instant::now();
        let observation = self
            .tracker
            .detect_or_track(&frame, &gray)
            .map_err(|e| PipelineError::Inference(e.to_string()))?;
        self.logger.timing("track", elapsed_ms(started));

        if !observation.success {
            log::debug!("no face found; result will carry baseline intensities");
        }

        let started = Instant::now();
        self.analyzer
            .ingest(&frame, &observation.landmarks, observation.success, 0.0, false)
            .map_err(|e| PipelineError::Inference(e.to_string()))?;
        self.logger.timing("ingest", elapsed_ms(started));

        let started = Instant::now();
        let result = self.analyzer.finalize_predictions();
        self.logger.timing("predict", elapsed_ms(started));

        self.state = State::Inferred { result };
        Ok(())
    }

    /// Hand out the computed result and return to `Idle`.
    ///
    /// Always returns a well-formed mapping: the stored result after a
    /// completed inference, an empty one otherwise. Both sessions are
    /// reset unconditionally and any staged frame is dropped, making the
    /// next request independent of this one.
    pub fn take_result(&mut self) -> AuResult {
        let result = match std::mem::replace(&mut self.state, State::Idle) {
            State::Inferred { result } => result,
            _ => AuResult::new(),
        };

        self.tracker.reset();
        self.analyzer.reset();
        result
    }

    /// Stage, infer, and take in one call: the entry point most callers
    /// need. Fails only on a malformed buffer.
    pub fn infer(&mut self, buffer: ArrayViewD<'_, u8>) -> Result<AuResult, PipelineError> {
        self.stage_frame(buffer)?;
        self.run_inference()?;
        Ok(self.take_result())
    }

    /// Emit the logger's end-of-run summary, if it keeps one.
    pub fn log_summary(&self) {
        self.logger.summary();
    }
}
