//! Endpoints of HTTP server.
//!
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use common::api::{
    ErrorResponse, HealthResponse, LoadModelRequest, MessageResponse, PredictRequest,
    PredictionResult,
};
use tower_http::cors::{Any, CorsLayer};

use crate::{holder::ModelHolder, postproc::postprocess, preproc::preprocess};

/// Failures reported to HTTP clients as `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    NoImageData,
    NoModelPath,
    ModelNotLoaded,
    Preprocess,
    LoadFailed,
    Internal(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NoImageData | Self::NoModelPath | Self::Preprocess => StatusCode::BAD_REQUEST,
            Self::ModelNotLoaded | Self::LoadFailed | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match self {
            Self::NoImageData => "No image data provided".into(),
            Self::NoModelPath => "No model path provided".into(),
            Self::ModelNotLoaded => "Model not loaded".into(),
            Self::Preprocess => "Failed to preprocess image".into(),
            Self::LoadFailed => "Failed to load model".into(),
            Self::Internal(e) => format!("{:#}", e),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.message();
        match self {
            Self::Internal(_) => log::error!("Request failed: {}", &error),
            _ => log::warn!("Rejected request ({}): {}", status, &error),
        }

        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Build the HTTP application around a model holder.
pub fn app(holder: Arc<ModelHolder>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/model/load", post(load_model))
        .layer(Extension(holder))
        .layer(cors)
}

/// Health check endpoint.
pub async fn health(Extension(holder): Extension<Arc<ModelHolder>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        model_loaded: holder.is_loaded(),
    })
}

/// Run the served model on a base64 image.
pub async fn predict(
    Extension(holder): Extension<Arc<ModelHolder>>,
    payload: Option<Json<PredictRequest>>,
) -> Result<Json<PredictionResult>, ApiError> {
    let (image_data, width, height) = match payload {
        Some(Json(PredictRequest {
            image_data: Some(image_data),
            width,
            height,
        })) if !image_data.is_empty() => (image_data, width, height),
        _ => return Err(ApiError::NoImageData),
    };

    let model = holder.current().ok_or(ApiError::ModelNotLoaded)?;
    log::debug!(
        "Predicting on {} bytes of image data ({}x{})",
        image_data.len(),
        width,
        height
    );

    let result = tokio::task::spawn_blocking(move || {
        let input = preprocess(&image_data, width, height).map_err(|e| {
            log::error!("Error preprocessing image: {:#}", e);
            ApiError::Preprocess
        })?;
        let outputs = model.run(input.into()).map_err(ApiError::Internal)?;

        Ok::<_, ApiError>(postprocess(model.decoder(), &outputs))
    })
    .await??;

    log::info!(
        "Predicted {:?} ({:.2}) from text {:?}",
        result.gesture,
        result.confidence,
        &result.text
    );

    Ok(Json(result))
}

/// Load (or replace) the served model.
pub async fn load_model(
    Extension(holder): Extension<Arc<ModelHolder>>,
    payload: Option<Json<LoadModelRequest>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let model_path = payload
        .and_then(|Json(req)| req.model_path)
        .filter(|path| !path.is_empty())
        .ok_or(ApiError::NoModelPath)?;
    log::info!("Model load requested for {}", &model_path);

    match tokio::task::spawn_blocking(move || holder.load(model_path)).await? {
        true => Ok(Json(MessageResponse {
            message: "Model loaded successfully".into(),
        })),
        false => Err(ApiError::LoadFailed),
    }
}
