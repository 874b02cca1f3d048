//! UI-agnostic conversation state types
//!
//! Everything here is plain data shared by the session and whatever front end
//! renders it. Nothing in this module depends on a UI framework.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Greeting every transcript starts with.
pub const GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";

/// Prefix for bot messages that report a failure
pub const ERROR_GLYPH: &str = "❌";

/// Most recent extracted facts kept in memory.
pub const MEMORY_CAPACITY: usize = 20;

/// Most recent user/bot exchanges kept for prompting.
pub const HISTORY_CAPACITY: usize = 10;

/// One entry in the visible transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub is_from_bot: bool,
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn user(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            is_from_bot: false,
            timestamp: Local::now(),
        }
    }

    pub fn bot(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            is_from_bot: true,
            timestamp: Local::now(),
        }
    }

    /// A bot message reporting a failed turn
    pub fn is_error(&self) -> bool {
        self.is_from_bot && self.text.starts_with(ERROR_GLYPH)
    }

    /// Short clock time, e.g. "3:07 PM"
    pub fn time_label(&self) -> String {
        self.timestamp.format("%-I:%M %p").to_string()
    }
}

/// A user message paired with the reply it got
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_text: String,
    pub bot_text: String,
}

/// A sentence inferred from something the user said
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryFact {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl MemoryFact {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered sequence that keeps only the newest `capacity` entries.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, dropping the oldest ones past capacity.
    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.push(item);
        }
    }

    /// The newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        self.items.iter().skip(self.items.len().saturating_sub(n))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
