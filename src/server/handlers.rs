use std::sync::Arc;

use axum::extract::{RawQuery, State};
use chrono::Utc;

use crate::core::errors::ApiError;
use crate::history::ConversationTurn;
use crate::state::{AppState, SessionState};

pub async fn health() -> &'static str {
    "OK"
}

/// The question-answering endpoint. The whole query string is the
/// URL-encoded question; sentinel commands are intercepted before any
/// reasoning happens.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<String, ApiError> {
    let raw = query.unwrap_or_default();
    let question = urlencoding::decode(&raw)
        .map_err(|_| ApiError::BadRequest("Question is not valid UTF-8".to_string()))?
        .trim()
        .to_string();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question is empty".to_string()));
    }

    // the lock is held across the round: one round at a time per session
    let mut session = state.session.lock().await;

    if let Some(reply) = handle_sentinel(&question, &mut session) {
        return Ok(reply);
    }

    let outcome = state
        .engine
        .run_round(&question, &session.history)
        .await
        .map_err(|err| match err {
            ApiError::EmptyIndex => ApiError::EmptyIndex,
            other => {
                tracing::error!("Reasoning round failed: {}", other);
                ApiError::ServiceUnavailable
            }
        })?;

    session.last_source = outcome.source.clone();
    session.last_reference = outcome.reference.clone();
    session.history.append(ConversationTurn {
        question,
        thought: outcome.thought,
        action: outcome.action,
        observation: outcome.observation,
        answer: outcome.answer.clone(),
        recorded_at: Utc::now(),
    });

    Ok(outcome.answer)
}

/// Reserved literal commands: reset clears the history, the status
/// commands echo the stored provenance of the last answered round.
fn handle_sentinel(question: &str, session: &mut SessionState) -> Option<String> {
    match question {
        "/reset" => {
            session.history.reset();
            session.last_source = None;
            session.last_reference = None;
            Some("History cleared.".to_string())
        }
        "/source" => Some(
            session
                .last_source
                .clone()
                .unwrap_or_else(|| "No source recorded yet.".to_string()),
        ),
        "/reference" => Some(
            session
                .last_reference
                .clone()
                .unwrap_or_else(|| "No reference recorded yet.".to_string()),
        ),
        _ => None,
    }
}
