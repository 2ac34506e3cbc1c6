pub const FACE_DETECTOR_MODEL_NAME: &str = "blazeface_short_range.onnx";
pub const FACE_DETECTOR_MODEL_URL: &str =
    "https://github.com/auscan/auscan/releases/download/v0.1.0/blazeface_short_range.onnx";

pub const LANDMARK_MODEL_NAME: &str = "landmark_68.onnx";
pub const LANDMARK_MODEL_URL: &str =
    "https://github.com/auscan/auscan/releases/download/v0.1.0/landmark_68.onnx";

pub const AU_MANIFEST_NAME: &str = "au_models.json";
pub const AU_MANIFEST_URL: &str =
    "https://github.com/auscan/auscan/releases/download/v0.1.0/au_models.json";

/// Side length of the canonical aligned face crop fed to feature extraction.
pub const ALIGNED_FACE_SIZE: u32 = 112;

/// Action Unit intensities are reported on the FACS 0-5 scale.
pub const AU_INTENSITY_MIN: f64 = 0.0;
pub const AU_INTENSITY_MAX: f64 = 5.0;
