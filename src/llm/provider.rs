use async_trait::async_trait;

use super::types::CompletionRequest;
use crate::core::errors::ApiError;

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// return the backend name (e.g. "ollama")
    fn name(&self) -> &str;

    /// text completion (non-streaming)
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ApiError>;
}

#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// one fixed-length vector per input, in input order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
