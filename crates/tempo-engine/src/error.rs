//! Error types for engine operations.

use tempo_types::Id;

/// Error type for engine and store operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Conversation id is not in the store.
    #[error("Conversation not found: {0}")]
    ConversationNotFound(Id),

    /// Message id is not in the conversation.
    #[error("Message not found: {0}")]
    MessageNotFound(Id),

    /// An open message already exists in the conversation.
    #[error("Conversation {0} already has an open message")]
    TurnInProgress(Id),

    /// The message cannot be regenerated.
    #[error("Nothing to regenerate for message {0}")]
    NothingToRegenerate(Id),

    /// Feedback can only be given on assistant messages.
    #[error("Message {0} is not an assistant message")]
    NotAssistant(Id),

    /// A message or task-step transition was rejected.
    #[error(transparent)]
    Model(#[from] tempo_types::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
