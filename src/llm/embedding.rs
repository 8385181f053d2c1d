use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::provider::EmbeddingBackend;
use crate::core::errors::ApiError;

/// Client for a llama-server-style embedding endpoint (`/v1/embeddings`).
/// Chunk and query embeddings go through the same model, so both live in
/// the same vector space.
#[derive(Clone)]
pub struct LlamaEmbedder {
    base_url: String,
    model: String,
    client: Client,
}

impl LlamaEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        LlamaEmbedder {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl EmbeddingBackend for LlamaEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": inputs,
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
                "Embedding request failed: {} {}",
                status, text
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        parse_embedding_response(&payload)
    }
}

fn parse_embedding_response(payload: &Value) -> Result<Vec<Vec<f32>>, ApiError> {
    let Some(data) = payload.get("data").and_then(|v| v.as_array()) else {
        return Err(ApiError::Internal(
            "Embedding response missing data array".to_string(),
        ));
    };

    let mut indexed_embeddings = Vec::with_capacity(data.len());
    for (fallback_idx, item) in data.iter().enumerate() {
        let Some(values) = item.get("embedding").and_then(|v| v.as_array()) else {
            return Err(ApiError::Internal(
                "Embedding response item missing embedding array".to_string(),
            ));
        };

        let mut embedding = Vec::with_capacity(values.len());
        for value in values {
            let Some(float_value) = value.as_f64() else {
                return Err(ApiError::Internal(
                    "Embedding contains non-numeric value".to_string(),
                ));
            };
            embedding.push(float_value as f32);
        }

        let index = item
            .get("index")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(fallback_idx);
        indexed_embeddings.push((index, embedding));
    }

    indexed_embeddings.sort_by_key(|(idx, _)| *idx);
    Ok(indexed_embeddings
        .into_iter()
        .map(|(_, embedding)| embedding)
        .collect())
}
