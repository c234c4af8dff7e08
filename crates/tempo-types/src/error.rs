//! Error types for model transitions.

use thiserror::Error;

use crate::message::MessageStatus;
use crate::task::StepStatus;

/// Result type alias using the model error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Violations of the message and task-step state machines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid message transition: {from} -> {to}")]
    InvalidTransition {
        from: MessageStatus,
        to: MessageStatus,
    },

    #[error("message is {0} and its content is frozen")]
    ContentFrozen(MessageStatus),

    #[error("content update is not a prefix extension ({previous} -> {next} bytes)")]
    NotPrefix { previous: usize, next: usize },

    #[error("step '{id}' cannot move from {from} to {to}")]
    StepRegression {
        id: String,
        from: StepStatus,
        to: StepStatus,
    },
}
