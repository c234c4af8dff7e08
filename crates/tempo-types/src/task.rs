//! Task steps narrated while a response is prepared.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Status of a single step. Ordered: a step only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Kind of request, used to pick which step sequence is narrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    Legal,
    Document,
    Drafting,
    General,
}

impl QueryCategory {
    pub const ALL: [QueryCategory; 4] = [
        QueryCategory::Legal,
        QueryCategory::Document,
        QueryCategory::Drafting,
        QueryCategory::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legal => "legal",
            Self::Document => "document",
            Self::Drafting => "drafting",
            Self::General => "general",
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled phase of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStep {
    pub id: String,
    pub label: String,
    status: StepStatus,
}

impl TaskStep {
    /// Create a pending step.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            status: StepStatus::Pending,
        }
    }

    /// Build a pending sequence with 1-based ids from labels.
    pub fn sequence<I, S>(labels: I) -> Vec<TaskStep>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| TaskStep::new((i + 1).to_string(), label))
            .collect()
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Move the step forward. Re-applying the current status is a no-op.
    pub fn advance(&mut self, next: StepStatus) -> Result<()> {
        if next < self.status {
            return Err(Error::StepRegression {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
