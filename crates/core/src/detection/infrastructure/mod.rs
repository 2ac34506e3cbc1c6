pub mod onnx_landmark_tracker;
