pub mod au_model;
pub mod face_aligner;
pub mod hog;
pub mod hog_au_analyzer;
