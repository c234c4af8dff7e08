//! Shared types for Tempo.
//!
//! The data model read and written by the pacing engine: conversations,
//! messages and their status machine, citation sources, and the task steps
//! narrated while a response is being prepared.

pub mod conversation;
pub mod error;
pub mod message;
pub mod source;
pub mod task;

pub use conversation::{Conversation, DEFAULT_CONVERSATION_TITLE, MIN_MESSAGES, TITLE_MAX_CHARS};
pub use error::{Error, Result};
pub use message::{Feedback, Message, MessagePatch, MessageStatus, Role};
pub use source::{Confidence, Source, SourceType};
pub use task::{QueryCategory, StepStatus, TaskStep};

/// Identifier for conversations and messages.
pub type Id = uuid::Uuid;

/// Wall-clock timestamp attached to records.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh random identifier.
pub fn new_id() -> Id {
    uuid::Uuid::new_v4()
}

/// Current wall-clock time.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}
