use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::CompletionBackend;
use super::types::CompletionRequest;
use crate::core::errors::ApiError;

/// Client for an Ollama-style text completion endpoint (`/api/generate`).
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        OllamaProvider {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl CompletionBackend for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ApiError> {
        let url = format!("{}/api/generate", self.base_url);

        let body = json!({
            "model": self.model,
            "prompt": request.prompt,
            "options": {
                "num_predict": request.options.num_predict,
                "temperature": request.options.temperature,
                "top_k": request.options.top_k,
                "stop": request.options.stop,
            },
            "stream": false,
        });

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Completion request failed: {} {}",
                status, text
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        let generated = payload
            .get("response")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ApiError::Internal("Completion response missing generated text".to_string())
            })?;

        Ok(generated.trim().to_string())
    }
}
