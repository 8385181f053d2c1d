pub mod embedding;
pub mod ollama;
pub mod provider;
pub mod retry;
pub mod types;

pub use embedding::LlamaEmbedder;
pub use ollama::OllamaProvider;
pub use provider::{CompletionBackend, EmbeddingBackend};
pub use retry::{CompletionService, RetryPolicy};
pub use types::{CompletionRequest, GenerationOptions};
