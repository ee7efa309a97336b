//! Mapping raw model outputs to prediction results.
//!
use std::collections::HashMap;

use anyhow::{bail, Result};
use common::api::{Gesture, PredictionResult};
use lazy_static::lazy_static;
use tract_onnx::prelude::Tensor;

use crate::nn::{ModelOutput, OutputDecoder};

/// Confidence reported for models that do not output one.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

lazy_static! {
    /// Recognized phrases, lowercase, and the gesture they stand for.
    static ref GESTURE_VOCABULARY: HashMap<&'static str, Gesture> = HashMap::from([
        ("hello", Gesture::Hello),
        ("hi", Gesture::Hello),
        ("thanks", Gesture::Thanks),
        ("thank you", Gesture::Thanks),
        ("help", Gesture::Help),
        ("wait", Gesture::Wait),
        ("yes", Gesture::Yes),
        ("no", Gesture::No),
        ("repeat", Gesture::Repeat),
        ("", Gesture::Idle),
    ]);
}

/// Look up the gesture for a phrase, case-insensitively. Unknown phrases are idle.
pub fn gesture_for(text: &str) -> Gesture {
    GESTURE_VOCABULARY
        .get(text.to_lowercase().as_str())
        .copied()
        .unwrap_or_default()
}

/// Decode the raw outputs of a model into a prediction result.
///
/// Outputs that fail to decode yield [`PredictionResult::fallback`].
pub fn postprocess(decoder: &OutputDecoder, outputs: &[Tensor]) -> PredictionResult {
    match decoder.decode(outputs).and_then(to_prediction) {
        Ok(result) => result,
        Err(e) => {
            log::error!("Error postprocessing prediction: {:#}", e);
            PredictionResult::fallback()
        }
    }
}

/// Build the prediction result for one model output.
pub fn to_prediction(output: ModelOutput) -> Result<PredictionResult> {
    let (text, confidence) = match output {
        ModelOutput::Pair { text, confidence } => (text, confidence),
        ModelOutput::Mapping { text, confidence } => {
            (text.unwrap_or_default(), confidence.unwrap_or(0.0))
        }
        ModelOutput::Scalar(text) => (text, DEFAULT_CONFIDENCE),
    };

    if !confidence.is_finite() {
        bail!("confidence {} is not a finite number", confidence);
    }

    Ok(PredictionResult {
        gesture: gesture_for(&text),
        text,
        confidence: confidence.clamp(0.0, 1.0),
        landmarks: vec![],
    })
}
