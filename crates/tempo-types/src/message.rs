//! Message types and the message status machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::source::Source;
use crate::{Id, Timestamp, new_id, now};

/// Role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Lifecycle of a message.
///
/// `Pending` and `Streaming` are open; `Complete` and `Error` are terminal and
/// freeze the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Streaming,
    Complete,
    Error,
}

impl MessageStatus {
    /// Whether the message may still change content.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Streaming)
    }

    /// Whether the status is final.
    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }

    /// Whether `self -> next` is a legal transition.
    ///
    /// Re-entering the same open status is allowed so repeated content writes
    /// stay idempotent.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, Streaming)
                | (Pending, Complete)
                | (Pending, Error)
                | (Streaming, Streaming)
                | (Streaming, Complete)
                | (Streaming, Error)
        )
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Streaming => "streaming",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// User rating of an assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Positive,
    Negative,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Id,
    pub role: Role,
    content: String,
    status: MessageStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feedback: Option<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    pub timestamp: Timestamp,
}

impl Message {
    fn new(role: Role, content: String, status: MessageStatus) -> Self {
        Self {
            id: new_id(),
            role,
            content,
            status,
            sources: Vec::new(),
            feedback: None,
            error: None,
            timestamp: now(),
        }
    }

    /// Create a complete user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), MessageStatus::Complete)
    }

    /// Create a complete system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content.into(), MessageStatus::Complete)
    }

    /// Create an empty assistant message awaiting its response.
    pub fn assistant_pending() -> Self {
        Self::new(Role::Assistant, String::new(), MessageStatus::Pending)
    }

    /// Create an already-complete assistant message (e.g. loaded from history).
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into(), MessageStatus::Complete)
    }

    /// Attach sources at creation time.
    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn feedback(&self) -> Option<Feedback> {
        self.feedback
    }

    /// Why the message ended in `Error`, if it did.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Replace the content with a longer cumulative value.
    ///
    /// The new text must extend the current content. A non-empty write moves a
    /// pending message to `Streaming`.
    pub fn set_content(&mut self, cumulative: &str) -> Result<()> {
        if !self.status.is_open() {
            return Err(Error::ContentFrozen(self.status));
        }
        if !cumulative.starts_with(self.content.as_str()) {
            return Err(Error::NotPrefix {
                previous: self.content.len(),
                next: cumulative.len(),
            });
        }
        if cumulative.len() > self.content.len() {
            self.content.push_str(&cumulative[self.content.len()..]);
        }
        if !self.content.is_empty() && self.status == MessageStatus::Pending {
            self.status = MessageStatus::Streaming;
        }
        Ok(())
    }

    /// Append a delta to the content.
    pub fn append_delta(&mut self, delta: &str) -> Result<()> {
        if !self.status.is_open() {
            return Err(Error::ContentFrozen(self.status));
        }
        self.content.push_str(delta);
        if !self.content.is_empty() && self.status == MessageStatus::Pending {
            self.status = MessageStatus::Streaming;
        }
        Ok(())
    }

    /// Move to a new status, enforcing the status machine.
    pub fn set_status(&mut self, next: MessageStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Mark the message as finished.
    pub fn complete(&mut self) -> Result<()> {
        self.set_status(MessageStatus::Complete)
    }

    /// Mark the message as failed, keeping its current content.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.set_status(MessageStatus::Error)?;
        self.error = Some(reason.into());
        Ok(())
    }

    /// Apply a rating; applying the current rating again clears it.
    pub fn toggle_feedback(&mut self, feedback: Feedback) {
        self.feedback = if self.feedback == Some(feedback) {
            None
        } else {
            Some(feedback)
        };
    }

    /// Apply a partial update through the regular transitions.
    ///
    /// Content is applied before status so a patch can deliver the last chunk
    /// and close the message at once.
    pub fn apply(&mut self, patch: MessagePatch) -> Result<()> {
        if let Some(content) = patch.content {
            self.set_content(&content)?;
        }
        if let Some(sources) = patch.sources {
            if !self.sources.is_empty() && self.sources != sources {
                return Err(Error::ContentFrozen(self.status));
            }
            self.sources = sources;
        }
        if let Some(status) = patch.status {
            if status == MessageStatus::Error {
                self.fail(patch.error.unwrap_or_else(|| "failed".to_string()))?;
            } else {
                self.set_status(status)?;
            }
        }
        if let Some(feedback) = patch.feedback {
            self.toggle_feedback(feedback);
        }
        Ok(())
    }
}

/// Partial update for [`Message::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub status: Option<MessageStatus>,
    pub sources: Option<Vec<Source>>,
    pub feedback: Option<Feedback>,
    pub error: Option<String>,
}

impl MessagePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn status(status: MessageStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: Some(MessageStatus::Error),
            error: Some(reason.into()),
            ..Self::default()
        }
    }
}
