//! Client for the gesture server HTTP API.
use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use common::api::{
    ErrorResponse, HealthResponse, LoadModelRequest, MessageResponse, PredictRequest,
    PredictionResult,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

/// Read an image file and encode it as base64.
pub fn encode_image_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(STANDARD.encode(bytes))
}

/// Thin wrapper over the three endpoints of the server.
pub struct GestureClient {
    client: Client,
    base_url: String,
}

impl GestureClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.client.get(self.url("/health")).send().await?;
        parse_response(resp).await
    }

    pub async fn load_model(&self, model_path: &str) -> Result<MessageResponse> {
        let body = LoadModelRequest {
            model_path: Some(model_path.to_owned()),
        };
        let resp = self
            .client
            .post(self.url("/model/load"))
            .json(&body)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn predict(&self, request: &PredictRequest) -> Result<PredictionResult> {
        let resp = self
            .client
            .post(self.url("/predict"))
            .json(request)
            .send()
            .await?;
        parse_response(resp).await
    }
}

/// Decode a success body, or turn an error body into an error.
async fn parse_response<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    match resp.json::<ErrorResponse>().await {
        Ok(ErrorResponse { error }) => bail!("server answered {}: {}", status, error),
        Err(_) => bail!("server answered {}", status),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_url_joins_routes() {
        let client = GestureClient::new("http://127.0.0.1:5000/");
        assert_eq!(client.url("/predict"), "http://127.0.0.1:5000/predict");
    }

    #[test]
    fn test_encode_image_file() -> Result<()> {
        let path = std::env::temp_dir().join(format!("gesture-client-{}.bin", std::process::id()));
        std::fs::write(&path, [0u8, 1, 2, 255])?;

        let encoded = encode_image_file(&path)?;
        assert_eq!(encoded, "AAEC/w==");

        std::fs::remove_file(&path)?;
        assert!(encode_image_file(&path).is_err());

        Ok(())
    }
}
