//! Bounded conversation history for streaming chat.

use std::collections::VecDeque;

use crate::types::ConversationMessage;

/// Default cap on retained messages.
pub const DEFAULT_MAX_MESSAGES: usize = 20;

/// Ordered message window, trimmed from the front.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    messages: VecDeque<ConversationMessage>,
    max_len: usize,
}

impl HistoryWindow {
    /// A window of at least one message, so a finished turn always keeps its reply.
    pub fn new(max_len: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            max_len: max_len.max(1),
        }
    }

    /// Seed a window with prior history, oldest first. The seed is not trimmed
    /// until the turn completes.
    pub fn from_messages(messages: impl IntoIterator<Item = ConversationMessage>, max_len: usize) -> Self {
        Self {
            messages: messages.into_iter().collect(),
            max_len: max_len.max(1),
        }
    }

    pub fn append(&mut self, message: ConversationMessage) {
        self.messages.push_back(message);
    }

    /// Evict the oldest messages until at most `max_len` remain.
    pub fn trim(&mut self, max_len: usize) {
        while self.messages.len() > max_len {
            self.messages.pop_front();
        }
    }

    /// Close a turn: append the assistant reply, then trim to the window size.
    pub fn complete_turn(&mut self, assistant: ConversationMessage) {
        self.append(assistant);
        self.trim(self.max_len);
    }

    pub fn snapshot(&self) -> Vec<ConversationMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

/// Collects streamed fragments into one assistant message.
#[derive(Debug, Clone, Default)]
pub struct StreamAggregator {
    buffer: String,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The finished reply, whitespace-trimmed.
    pub fn finish(self) -> ConversationMessage {
        ConversationMessage::assistant(self.buffer.trim())
    }
}
