//! Bounded conversation window.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of turns kept.
pub const DEFAULT_MAX_HISTORY: usize = 5;

/// One question and the answer given to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_text: String,
    pub assistant_text: String,
}

/// Insertion-ordered turns, never more than `max_history` of them.
///
/// Not synchronized; a service shared across tasks wraps it in a lock.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    max_history: usize,
}

impl ConversationHistory {
    /// A bound of zero is raised to one.
    pub fn new(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            turns: VecDeque::with_capacity(max_history + 1),
            max_history,
        }
    }

    /// Append a turn, evicting the oldest ones beyond the bound.
    pub fn record(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>) {
        self.turns.push_back(ConversationTurn {
            user_text: user_text.into(),
            assistant_text: assistant_text.into(),
        });
        while self.turns.len() > self.max_history {
            self.turns.pop_front();
        }
    }

    /// Format the retained turns oldest first; empty when there are none.
    pub fn render(&self) -> String {
        if self.turns.is_empty() {
            return String::new();
        }

        let mut out = String::from("Previous conversation:\n");
        for turn in &self.turns {
            out.push_str(&format!("User: {}\n", turn.user_text));
            out.push_str(&format!("Assistant: {}\n\n", turn.assistant_text));
        }
        out
    }

    pub fn clear(&mut self) {
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

    pub fn max_history(&self) -> usize {
        self.max_history
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}
