//! JSON types exchanged over the HTTP API.
//!
use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};

/// Width assumed when a predict request does not carry one.
pub const DEFAULT_WIDTH: u32 = 640;
/// Height assumed when a predict request does not carry one.
pub const DEFAULT_HEIGHT: u32 = 480;

/// Body of `POST /predict`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictRequest {
    /// Base64 encoded image, optionally with a `data:` URL prefix.
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default = "default_width", deserialize_with = "lenient_width")]
    pub width: u32,
    #[serde(default = "default_height", deserialize_with = "lenient_height")]
    pub height: u32,
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

/// A frame dimension hint, which may hold any JSON value.
#[derive(Deserialize)]
#[serde(untagged)]
enum DimHint {
    Pixels(u32),
    Other(IgnoredAny),
}

impl DimHint {
    fn or(self, fallback: u32) -> u32 {
        match self {
            Self::Pixels(pixels) => pixels,
            Self::Other(_) => fallback,
        }
    }
}

// Hints never reject a request, values that are not pixel counts take the default.
fn lenient_width<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(DimHint::deserialize(deserializer)?.or(DEFAULT_WIDTH))
}

fn lenient_height<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(DimHint::deserialize(deserializer)?.or(DEFAULT_HEIGHT))
}

impl PredictRequest {
    pub fn new(image_data: String) -> Self {
        Self {
            image_data: Some(image_data),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// Body of `POST /model/load`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoadModelRequest {
    #[serde(default)]
    pub model_path: Option<String>,
}

/// Canonical gesture tags.
#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    Hello,
    Thanks,
    Help,
    Wait,
    Yes,
    No,
    Repeat,
    #[default]
    Idle,
}

/// A single landmark point `[x, y, z]`.
pub type Landmark = [f32; 3];

/// Result of one prediction.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PredictionResult {
    pub text: String,
    pub confidence: f64,
    pub gesture: Gesture,
    pub landmarks: Vec<Landmark>,
}

impl PredictionResult {
    /// Result reported when the model output could not be interpreted.
    pub fn fallback() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            gesture: Gesture::Idle,
            landmarks: vec![],
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

/// Success body of `POST /model/load`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of every error response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
