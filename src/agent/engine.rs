use std::sync::Arc;

use uuid::Uuid;

use super::action::{self, ToolAction};
use super::parser;
use super::prompt::{self, PassageKind};
use crate::core::errors::ApiError;
use crate::doc::ingest::Document;
use crate::doc::search;
use crate::history::SessionHistory;
use crate::llm::provider::EmbeddingBackend;
use crate::llm::retry::CompletionService;
use crate::llm::types::CompletionRequest;
use crate::tools::exchange::{self, RateSource};

/// Everything one completed reasoning round produced. The caller records
/// it in the session history and keeps source/reference for the status
/// commands.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub thought: Option<String>,
    pub action: Option<String>,
    pub observation: Option<String>,
    pub answer: String,
    pub source: Option<String>,
    pub reference: Option<String>,
}

struct DispatchOutcome {
    observation: String,
    answer: String,
    source: String,
    reference: Option<String>,
}

/// Drives one question through the reasoning protocol: compose the prompt,
/// call the completion backend, parse the fields, dispatch a tool action
/// when one was requested, and synthesize the final answer.
pub struct ReasonEngine {
    llm: CompletionService,
    embedder: Arc<dyn EmbeddingBackend>,
    rates: Arc<dyn RateSource>,
    document: Arc<Document>,
    exchange_enabled: bool,
}

impl ReasonEngine {
    pub fn new(
        llm: CompletionService,
        embedder: Arc<dyn EmbeddingBackend>,
        rates: Arc<dyn RateSource>,
        document: Arc<Document>,
        exchange_enabled: bool,
    ) -> Self {
        ReasonEngine {
            llm,
            embedder,
            rates,
            document,
            exchange_enabled,
        }
    }

    pub async fn run_round(
        &self,
        question: &str,
        history: &SessionHistory,
    ) -> Result<RoundOutcome, ApiError> {
        let round_id = Uuid::new_v4();
        tracing::info!(%round_id, "Reasoning about: {}", question);

        let request = CompletionRequest::new(prompt::reason_prompt(history, question));
        let completion = self.llm.complete(&request).await?;
        tracing::debug!(%round_id, "Completion:\n{}", completion);

        let fields = parser::parse(&completion);
        let tool_action = fields.action.as_deref().and_then(action::parse_action);

        let Some(tool_action) = tool_action else {
            // no runnable action: the parsed answer is the round's answer,
            // or the raw completion when no markers were found at all
            let answer = fields
                .answer
                .clone()
                .unwrap_or_else(|| completion.trim().to_string());
            return Ok(RoundOutcome {
                thought: fields.thought,
                action: fields.action,
                observation: fields.observation,
                answer,
                source: None,
                reference: None,
            });
        };

        let dispatched = self
            .dispatch(tool_action, question, fields.observation.as_deref())
            .await?;
        tracing::info!(%round_id, "Answer sourced from {}", dispatched.source);

        Ok(RoundOutcome {
            thought: fields.thought,
            action: fields.action,
            observation: Some(dispatched.observation),
            answer: dispatched.answer,
            source: Some(dispatched.source),
            reference: dispatched.reference,
        })
    }

    /// Resolves one tool action. An unrecognized (or disabled) verb is
    /// redirected to a document lookup of the original question exactly
    /// once; the flag makes the bound structural rather than relying on
    /// what the synthesized action happens to be.
    async fn dispatch(
        &self,
        action: ToolAction,
        question: &str,
        hint: Option<&str>,
    ) -> Result<DispatchOutcome, ApiError> {
        let mut action = action;
        let mut redirected = false;

        loop {
            match action {
                ToolAction::Lookup { terms } => {
                    return self.run_lookup(&terms, question, hint).await;
                }
                ToolAction::Exchange { from, to } => {
                    if self.exchange_enabled {
                        return self.run_exchange(&from, &to, question).await;
                    }
                    tracing::warn!("Exchange tool is disabled, treating action as unrecognized");
                    action = ToolAction::Unrecognized {
                        verb: "exchange".to_string(),
                        args: vec![from, to],
                    };
                }
                ToolAction::Unrecognized { verb, .. } => {
                    if redirected {
                        return Ok(memory_outcome(question, hint));
                    }
                    tracing::warn!("Unrecognized action verb '{}', retrying as lookup", verb);
                    redirected = true;
                    action = ToolAction::Lookup {
                        terms: question.to_string(),
                    };
                }
            }
        }
    }

    async fn run_lookup(
        &self,
        terms: &str,
        question: &str,
        hint: Option<&str>,
    ) -> Result<DispatchOutcome, ApiError> {
        tracing::debug!("Looking up: {}", terms);

        let query = match hint {
            Some(hint) => format!("{question} {hint}"),
            None => question.to_string(),
        };
        let results =
            search::search(self.embedder.as_ref(), &query, &self.document, search::TOP_K).await?;
        let best = results.first().ok_or(ApiError::EmptyIndex)?;

        if best.score < search::MIN_SCORE {
            tracing::info!(
                "Best match scored {:.2}, answering from model memory",
                best.score
            );
            return Ok(memory_outcome(question, hint));
        }

        let passages = search::passage_block(&self.document, &results);
        let request = CompletionRequest::new(prompt::compose_answer_prompt(
            PassageKind::ReferenceDocument,
            &passages,
            question,
        ));
        let completion = self.llm.complete(&request).await?;
        let answer = parser::parse(&completion)
            .answer
            .unwrap_or_else(|| completion.trim().to_string());

        // cite the single chunk closest to what was actually answered
        let citation = search::search(self.embedder.as_ref(), &answer, &self.document, 1).await?;
        let source = citation
            .first()
            .map(|hit| {
                let chunk = &self.document.chunks()[hit.index];
                format!(
                    "document page {}, {}% match",
                    chunk.page,
                    (hit.score * 100.0).round()
                )
            })
            .unwrap_or_else(|| "reference document".to_string());

        Ok(DispatchOutcome {
            observation: answer.clone(),
            answer,
            source,
            reference: Some(passages),
        })
    }

    async fn run_exchange(
        &self,
        from: &str,
        to: &str,
        question: &str,
    ) -> Result<DispatchOutcome, ApiError> {
        let quote = self.rates.latest(from, to).await?;
        let statement = exchange::rate_statement(from, to, &quote);
        tracing::debug!("Exchange result: {}", statement);

        let request = CompletionRequest::new(prompt::compose_answer_prompt(
            PassageKind::ExchangeRate,
            &statement,
            question,
        ));
        let completion = self.llm.complete(&request).await?;
        let answer = parser::parse(&completion)
            .answer
            .unwrap_or_else(|| completion.trim().to_string());

        Ok(DispatchOutcome {
            observation: statement.clone(),
            answer,
            source: "exchange rate service".to_string(),
            reference: Some(statement),
        })
    }
}

/// Retrieval miss: the model's own observation (or the question itself)
/// stands in as the answer, marked as coming from memory so no citation
/// is fabricated.
fn memory_outcome(question: &str, hint: Option<&str>) -> DispatchOutcome {
    let recalled = hint.unwrap_or(question).to_string();
    DispatchOutcome {
        observation: recalled.clone(),
        answer: recalled,
        source: "model memory".to_string(),
        reference: None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::doc::{ingest, source};
    use crate::llm::provider::CompletionBackend;
    use crate::llm::retry::RetryPolicy;
    use crate::tools::exchange::RateQuote;

    struct ScriptedCompletion {
        responses: Mutex<VecDeque<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedCompletion {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(ScriptedCompletion {
                responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedCompletion {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .ok_or_else(|| ApiError::Internal("script exhausted".to_string()))
        }
    }

    /// Deterministic stand-in for the embedding backend: one dimension per
    /// keyword, so similarity is easy to reason about in tests.
    struct KeywordEmbedder {
        calls: AtomicUsize,
    }

    impl KeywordEmbedder {
        fn new() -> Arc<Self> {
            Arc::new(KeywordEmbedder {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn keyword_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        ["capital", "france", "paris", "photosynthesis"]
            .iter()
            .map(|term| if lower.contains(term) { 1.0 } else { 0.0 })
            .collect()
    }

    #[async_trait]
    impl EmbeddingBackend for KeywordEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(inputs.iter().map(|input| keyword_vector(input)).collect())
        }
    }

    struct RecordingRates {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl RecordingRates {
        fn new() -> Arc<Self> {
            Arc::new(RecordingRates {
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RateSource for RecordingRates {
        async fn latest(&self, from: &str, to: &str) -> Result<RateQuote, ApiError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((from.to_string(), to.to_string()));
            Ok(RateQuote {
                rate: 0.8276,
                last_updated: "Tue, 05 Aug 2025 00:02:31 +0000".to_string(),
            })
        }
    }

    async fn ingested(embedder: &KeywordEmbedder, text: &str) -> Document {
        let pages = source::paginate(text);
        ingest::ingest(embedder, &pages)
            .await
            .expect("ingest should succeed")
    }

    fn engine(
        completion: Arc<ScriptedCompletion>,
        embedder: Arc<KeywordEmbedder>,
        rates: Arc<RecordingRates>,
        document: Document,
    ) -> ReasonEngine {
        ReasonEngine::new(
            CompletionService::new(completion, RetryPolicy::default()),
            embedder,
            rates,
            Arc::new(document),
            true,
        )
    }

    #[tokio::test]
    async fn lookup_round_answers_from_the_document_with_a_citation() {
        let embedder = KeywordEmbedder::new();
        let document = ingested(&embedder, "Paris is the capital of France.").await;
        let completion = ScriptedCompletion::new(&[
            "Thought: This is about geography.\n\
             Action: lookup: capital of France.\n\
             Observation: Paris is the capital of France.\n\
             Answer: The capital of France is Paris.",
            "Answer: Paris is the capital of France.",
        ]);
        let engine = engine(
            completion.clone(),
            embedder.clone(),
            RecordingRates::new(),
            document,
        );

        let outcome = engine
            .run_round("What is the capital of France?", &SessionHistory::default())
            .await
            .expect("round should succeed");

        assert!(outcome.answer.contains("Paris"));
        let source = outcome.source.expect("lookup hit should carry a source");
        assert!(source.contains("page 1"), "unexpected source: {source}");
        assert!(outcome
            .reference
            .expect("lookup hit should carry a reference")
            .contains("Paris"));
        assert_eq!(completion.calls(), 2);
    }

    #[tokio::test]
    async fn exchange_round_quotes_the_rate_backend() {
        let embedder = KeywordEmbedder::new();
        let document = ingested(&embedder, "Paris is the capital of France.").await;
        let completion = ScriptedCompletion::new(&[
            "Thought: This is about currency exchange rates.\n\
             Action: exchange: USD EUR\n\
             Observation: 0.8276 EUR for 1 USD.\n\
             Answer: draft",
            "Answer: One US dollar currently buys 0.8276 EUR.",
        ]);
        let rates = RecordingRates::new();
        let engine = engine(completion.clone(), embedder, rates.clone(), document);

        let outcome = engine
            .run_round(
                "What is the exchange rate from USD to EUR?",
                &SessionHistory::default(),
            )
            .await
            .expect("round should succeed");

        let calls = rates.calls.lock().expect("calls lock");
        assert_eq!(calls.as_slice(), &[("USD".to_string(), "EUR".to_string())]);
        let observation = outcome.observation.expect("exchange records the statement");
        assert!(observation.contains("EUR") && observation.contains("0.8276"));
        assert_eq!(outcome.answer, "One US dollar currently buys 0.8276 EUR.");
        assert_eq!(outcome.source.as_deref(), Some("exchange rate service"));
        assert_eq!(outcome.reference.as_deref(), Some(observation.as_str()));
    }

    #[tokio::test]
    async fn unrecognized_verb_falls_back_to_lookup_exactly_once() {
        let embedder = KeywordEmbedder::new();
        // document unrelated to the question, so the fallback lookup misses
        let document = ingested(&embedder, "Photosynthesis converts light into energy.").await;
        let completion = ScriptedCompletion::new(&[
            "Thought: This needs translation.\n\
             Action: translate: hello\n\
             Observation: hello is hola in Spanish.\n\
             Answer: hola",
        ]);
        let engine = engine(
            completion.clone(),
            embedder.clone(),
            RecordingRates::new(),
            document,
        );
        let ingest_embed_calls = embedder.calls();

        let outcome = engine
            .run_round("What is hello in Spanish?", &SessionHistory::default())
            .await
            .expect("round should succeed");

        // one reasoning completion, no composition call after the miss
        assert_eq!(completion.calls(), 1);
        // exactly one query embedding: the single redirected lookup
        assert_eq!(embedder.calls() - ingest_embed_calls, 1);
        assert_eq!(outcome.answer, "hello is hola in Spanish.");
        assert_eq!(outcome.source.as_deref(), Some("model memory"));
        assert!(outcome.reference.is_none());
    }

    #[tokio::test]
    async fn round_without_action_answers_the_parsed_answer() {
        let embedder = KeywordEmbedder::new();
        let document = ingested(&embedder, "Paris is the capital of France.").await;
        let completion = ScriptedCompletion::new(&["Thought: easy.\nAnswer: 42"]);
        let engine = engine(completion, embedder, RecordingRates::new(), document);

        let outcome = engine
            .run_round("What is six times seven?", &SessionHistory::default())
            .await
            .expect("round should succeed");

        assert_eq!(outcome.answer, "42");
        assert!(outcome.source.is_none());
    }

    #[tokio::test]
    async fn round_without_markers_answers_the_raw_completion() {
        let embedder = KeywordEmbedder::new();
        let document = ingested(&embedder, "Paris is the capital of France.").await;
        let completion = ScriptedCompletion::new(&["I can only reply in plain prose."]);
        let engine = engine(completion, embedder, RecordingRates::new(), document);

        let outcome = engine
            .run_round("Say something.", &SessionHistory::default())
            .await
            .expect("round should succeed");

        assert_eq!(outcome.answer, "I can only reply in plain prose.");
    }

    #[tokio::test]
    async fn lookup_against_an_empty_document_fails_explicitly() {
        let embedder = KeywordEmbedder::new();
        let completion = ScriptedCompletion::new(&[
            "Thought: checking the document.\n\
             Action: lookup: anything\n\
             Answer: draft",
        ]);
        let engine = engine(
            completion,
            embedder,
            RecordingRates::new(),
            Document::default(),
        );

        let result = engine
            .run_round("What does the document say?", &SessionHistory::default())
            .await;
        assert!(matches!(result, Err(ApiError::EmptyIndex)));
    }

    #[tokio::test]
    async fn disabled_exchange_tool_redirects_to_lookup() {
        let embedder = KeywordEmbedder::new();
        let document = ingested(&embedder, "Photosynthesis converts light into energy.").await;
        let completion = ScriptedCompletion::new(&[
            "Thought: rates.\n\
             Action: exchange: USD EUR\n\
             Observation: 0.8 EUR per USD.\n\
             Answer: draft",
        ]);
        let rates = RecordingRates::new();
        let engine = ReasonEngine::new(
            CompletionService::new(completion.clone(), RetryPolicy::default()),
            embedder,
            rates.clone(),
            Arc::new(document),
            false,
        );

        let outcome = engine
            .run_round("What is the USD to EUR rate?", &SessionHistory::default())
            .await
            .expect("round should succeed");

        assert!(rates.calls.lock().expect("calls lock").is_empty());
        assert_eq!(outcome.source.as_deref(), Some("model memory"));
        assert_eq!(outcome.answer, "0.8 EUR per USD.");
    }
}
