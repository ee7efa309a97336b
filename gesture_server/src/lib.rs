//! HTTP server recognizing gestures in images with an ONNX model.
pub mod endpoints;
pub mod holder;
pub mod nn;
pub mod postproc;
pub mod preproc;

/// Model loaded at startup unless told otherwise.
pub const DEFAULT_MODEL_PATH: &str = "models/gesture.onnx";
