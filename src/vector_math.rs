use ndarray::ArrayView1;

use crate::core::errors::ApiError;

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, ApiError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(ApiError::BadRequest(
            "Vectors must not be empty".to_string(),
        ));
    }
    if query.len() != candidate.len() {
        return Err(ApiError::BadRequest(format!(
            "Vector length mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }

    let query_view = ArrayView1::from(query);
    let candidate_view = ArrayView1::from(candidate);

    let dot = query_view.dot(&candidate_view);
    let denom = query_view.dot(&query_view).sqrt() * candidate_view.dot(&candidate_view).sqrt();
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok(dot / denom)
}
