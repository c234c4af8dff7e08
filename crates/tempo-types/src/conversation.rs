//! Conversations: ordered, append-only message lists.

use serde::{Deserialize, Serialize};

use crate::message::{Message, Role};
use crate::{Id, Timestamp, new_id, now};

/// Title given to conversations before the first user message names them.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New conversation";

/// Smallest usable message cap: a turn needs its user message and the
/// answer to it.
pub const MIN_MESSAGES: usize = 2;

/// Number of characters of the first user message used as a title.
pub const TITLE_MAX_CHARS: usize = 50;

/// A conversation and its messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Id,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new(title: impl Into<String>) -> Self {
        let now = now();
        Self {
            id: new_id(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message, evicting the oldest messages when `max_messages` is
    /// reached.
    ///
    /// At capacity the oldest 10% (minimum 1) are dropped at once so eviction
    /// does not shift the list on every append. The latest user message is
    /// never evicted: it is the question a running or regenerated turn
    /// answers. Caps below [`MIN_MESSAGES`] are raised to it.
    pub fn push_message(&mut self, message: Message, max_messages: usize) -> usize {
        let cap = max_messages.max(MIN_MESSAGES);
        let before = self.messages.len();
        if before >= cap {
            let keep = self.messages.iter().rposition(|m| m.role == Role::User);
            let mut remaining = (cap / 10).max(1);
            let mut index = 0;
            self.messages.retain(|_| {
                let current = index;
                index += 1;
                if remaining > 0 && Some(current) != keep {
                    remaining -= 1;
                    false
                } else {
                    true
                }
            });
        }
        let evicted = before - self.messages.len();
        self.messages.push(message);
        self.updated_at = now();
        evicted
    }

    pub fn message(&self, id: Id) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: Id) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// The message that is still pending or streaming, if any.
    pub fn open_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_open())
    }

    /// Title derived from a first user message: the first
    /// [`TITLE_MAX_CHARS`] characters, with `...` when cut.
    pub fn title_from(text: &str) -> String {
        let trimmed = text.trim();
        let mut title: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        if trimmed.chars().count() > TITLE_MAX_CHARS {
            title.push_str("...");
        }
        title
    }

    /// Whether the conversation still carries the placeholder title.
    pub fn is_untitled(&self) -> bool {
        self.title == DEFAULT_CONVERSATION_TITLE
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERSATION_TITLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_short_message() {
        assert_eq!(Conversation::title_from("  Can my landlord evict me? "), "Can my landlord evict me?");
    }

    #[test]
    fn test_title_from_long_message_is_cut() {
        let text = "a".repeat(60);
        let title = Conversation::title_from(&text);
        assert_eq!(title, format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn test_push_evicts_oldest_tenth() {
        let mut conv = Conversation::default();
        for i in 0..10 {
            conv.push_message(Message::user(format!("m{i}")), 10);
        }
        let evicted = conv.push_message(Message::user("m10"), 10);

        assert_eq!(evicted, 1);
        assert_eq!(conv.messages.len(), 10);
        assert_eq!(conv.messages[0].content(), "m1");
        assert_eq!(conv.messages[9].content(), "m10");
    }

    #[test]
    fn test_tiny_cap_keeps_the_question_being_answered() {
        let mut conv = Conversation::default();
        for turn in 0..3 {
            conv.push_message(Message::user(format!("q{turn}")), 1);
            conv.push_message(Message::assistant_pending(), 1);
        }

        assert_eq!(conv.messages.len(), MIN_MESSAGES);
        assert_eq!(conv.messages[0].content(), "q2");
        assert!(conv.messages[1].is_open());

        // a second answer to the same question pushes out the first one
        conv.push_message(Message::assistant("retry"), 1);
        assert_eq!(conv.messages[0].content(), "q2");
        assert_eq!(conv.messages[1].content(), "retry");
    }

    #[test]
    fn test_open_message_is_newest_open() {
        let mut conv = Conversation::default();
        conv.push_message(Message::user("q"), 100);
        assert!(conv.open_message().is_none());

        let pending = Message::assistant_pending();
        let id = pending.id;
        conv.push_message(pending, 100);
        assert_eq!(conv.open_message().map(|m| m.id), Some(id));
    }
}
