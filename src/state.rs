use std::sync::Arc;

use tokio::sync::Mutex;

use crate::agent::ReasonEngine;
use crate::config::Settings;
use crate::core::errors::ApiError;
use crate::doc::{ingest, source};
use crate::history::SessionHistory;
use crate::llm::{CompletionService, LlamaEmbedder, OllamaProvider, RetryPolicy};
use crate::tools::{ExchangeRateClient, RateSource};

/// Per-session mutable state: the bounded history plus the provenance of
/// the most recent answered round, for the status commands.
#[derive(Debug, Default)]
pub struct SessionState {
    pub history: SessionHistory,
    pub last_source: Option<String>,
    pub last_reference: Option<String>,
}

/// Global application state shared across routes. The document index is
/// built once here and never mutated afterwards; the session sits behind
/// an async mutex so at most one reasoning round runs at a time.
pub struct AppState {
    pub settings: Settings,
    pub engine: ReasonEngine,
    pub session: Mutex<SessionState>,
}

impl AppState {
    pub async fn initialize(settings: Settings) -> Result<Arc<Self>, ApiError> {
        let embedder = Arc::new(LlamaEmbedder::new(
            settings.llm.embedding_base_url.clone(),
            settings.llm.embedding_model.clone(),
        ));

        let completion = CompletionService::new(
            Arc::new(OllamaProvider::new(
                settings.llm.completion_base_url.clone(),
                settings.llm.completion_model.clone(),
            )),
            RetryPolicy {
                max_attempts: settings.llm.max_attempts,
                delay: settings.retry_delay(),
            },
        );

        let pages = if settings.document.path.exists() {
            source::load_pages(&settings.document.path)?
        } else {
            tracing::warn!(
                "Document {} not found; lookups will fail until one is provided",
                settings.document.path.display()
            );
            Vec::new()
        };
        let document = Arc::new(ingest::ingest(embedder.as_ref(), &pages).await?);

        let rates: Arc<dyn RateSource> =
            Arc::new(ExchangeRateClient::new(settings.tools.exchange_base_url.clone()));
        let engine = ReasonEngine::new(
            completion,
            embedder,
            rates,
            document,
            settings.tools.exchange_enabled,
        );

        Ok(Arc::new(AppState {
            settings,
            engine,
            session: Mutex::new(SessionState::default()),
        }))
    }
}
