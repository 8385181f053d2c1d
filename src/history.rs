use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Retained turns feeding the reasoning prompt's history block.
pub const HISTORY_CAPACITY: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    pub question: String,
    pub thought: Option<String>,
    pub action: Option<String>,
    pub observation: Option<String>,
    pub answer: String,
    pub recorded_at: DateTime<Utc>,
}

/// Bounded conversation log for one serving session. Passed into each
/// reasoning round as an explicit context object; the only mutations are
/// `append` and `reset`.
#[derive(Debug, Default)]
pub struct SessionHistory {
    turns: VecDeque<ConversationTurn>,
}

impl SessionHistory {
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > HISTORY_CAPACITY {
            self.turns.pop_front();
        }
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
