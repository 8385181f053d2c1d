use std::time::Instant;

use serde::Serialize;

use super::source::{self, PageText};
use crate::core::errors::ApiError;
use crate::llm::provider::EmbeddingBackend;

/// Sentences per embedding unit. Overlapping windows keep enough context
/// around each sentence for the similarity scores to stay meaningful.
const WINDOW_SENTENCES: usize = 3;

/// One embedded unit of the ingested document. Immutable after ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub index: usize,
    pub offset: usize,
    pub text: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub page: usize,
}

/// The ingested document: an ordered, read-only chunk sequence.
#[derive(Debug, Default)]
pub struct Document {
    chunks: Vec<Chunk>,
}

impl Document {
    pub(crate) fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Document { chunks }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceChunk {
    pub offset: usize,
    pub text: String,
}

fn is_punctuator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Splits text into sentence-like chunks. A boundary is a terminal
/// punctuator immediately followed by whitespace; the punctuator stays
/// with the preceding chunk.
pub fn split_sentences(text: &str) -> Vec<SentenceChunk> {
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        let next_is_whitespace = chars
            .peek()
            .map(|(_, next)| next.is_whitespace())
            .unwrap_or(false);

        if is_punctuator(ch) && next_is_whitespace {
            let end = pos + ch.len_utf8();
            let trimmed = text[start..end].trim();
            if !trimmed.is_empty() {
                chunks.push(SentenceChunk {
                    offset: start,
                    text: trimmed.to_string(),
                });
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        chunks.push(SentenceChunk {
            offset: start,
            text: tail.to_string(),
        });
    }

    chunks
}

struct EmbeddingUnit {
    index: usize,
    offset: usize,
    text: String,
}

/// Sliding windows of up to three consecutive sentences, each unit indexed
/// and offset by its first sentence.
fn embedding_units(sentences: &[SentenceChunk]) -> Vec<EmbeddingUnit> {
    sentences
        .iter()
        .enumerate()
        .map(|(index, first)| {
            let end = (index + WINDOW_SENTENCES).min(sentences.len());
            let text = sentences[index..end]
                .iter()
                .map(|sentence| sentence.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            EmbeddingUnit {
                index,
                offset: first.offset,
                text,
            }
        })
        .collect()
}

/// Builds the searchable document from extracted pages. An empty document
/// yields an empty chunk sequence; lookups against it fail explicitly
/// rather than pretending to retrieve anything.
pub async fn ingest(
    embedder: &dyn EmbeddingBackend,
    pages: &[PageText],
) -> Result<Document, ApiError> {
    let (text, page_map) = source::flatten_pages(pages);
    let sentences = split_sentences(&text);
    if sentences.is_empty() {
        tracing::warn!("Document produced no chunks; lookups will fail until one is ingested");
        return Ok(Document::default());
    }

    let units = embedding_units(&sentences);
    let inputs: Vec<String> = units.iter().map(|unit| unit.text.clone()).collect();

    let started = Instant::now();
    let vectors = embedder.embed(&inputs).await?;
    if vectors.len() != units.len() {
        return Err(ApiError::Internal(format!(
            "Embedding count mismatch: {} != {}",
            vectors.len(),
            units.len()
        )));
    }

    let chunks = units
        .into_iter()
        .zip(vectors)
        .map(|(unit, embedding)| Chunk {
            index: unit.index,
            offset: unit.offset,
            page: page_map.page_of(unit.offset),
            text: unit.text,
            embedding,
        })
        .collect::<Vec<_>>();

    tracing::info!(
        "Ingested {} chunks in {}ms",
        chunks.len(),
        started.elapsed().as_millis()
    );
    Ok(Document::from_chunks(chunks))
}
