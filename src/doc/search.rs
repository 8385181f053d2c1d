use std::cmp::Ordering;

use super::ingest::Document;
use crate::core::errors::ApiError;
use crate::llm::provider::EmbeddingBackend;
use crate::vector_math;

pub const TOP_K: usize = 3;

/// Best-match score below which retrieval counts as a miss and the caller
/// must answer from model memory instead of fabricating a citation.
pub const MIN_SCORE: f32 = 0.4;

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub index: usize,
    pub score: f32,
}

/// Scores every chunk against the query by cosine similarity and returns
/// up to `top_k` results ordered by decreasing score, ties broken by
/// ascending chunk index.
pub async fn search(
    embedder: &dyn EmbeddingBackend,
    query: &str,
    document: &Document,
    top_k: usize,
) -> Result<Vec<SearchResult>, ApiError> {
    if document.is_empty() {
        return Err(ApiError::EmptyIndex);
    }

    let mut vectors = embedder.embed(&[query.to_string()]).await?;
    let query_vector = vectors.pop().ok_or_else(|| {
        ApiError::Internal("Embedding backend returned no query vector".to_string())
    })?;

    let mut scored = Vec::with_capacity(document.len());
    for chunk in document.chunks() {
        let score = vector_math::cosine_similarity(&query_vector, &chunk.embedding)?;
        scored.push(SearchResult {
            index: chunk.index,
            score,
        });
    }

    scored.sort_by(|left, right| {
        right
            .score
            .partial_cmp(&left.score)
            .unwrap_or(Ordering::Equal)
            .then(left.index.cmp(&right.index))
    });
    scored.truncate(top_k);
    Ok(scored)
}

/// Concatenates the candidate chunks in document order, deduplicated, so
/// the passage block reads coherently for the composition call.
pub fn passage_block(document: &Document, results: &[SearchResult]) -> String {
    let mut indices: Vec<usize> = results.iter().map(|result| result.index).collect();
    indices.sort_unstable();
    indices.dedup();

    indices
        .into_iter()
        .filter_map(|index| document.chunks().get(index))
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
