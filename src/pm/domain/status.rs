//! Stored task state and the single derived-status definition.

use super::ParseTaskStateError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored lifecycle state of a PM task.
///
/// Pending and Overdue are not stored states: both are derivations of
/// [`TaskState::Open`] against the caller-supplied clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Task is awaiting completion.
    Open,
    /// Task has been completed and is immutable history.
    Completed,
    /// Task has been cancelled without a follow-on.
    Cancelled,
}

impl TaskState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether the state admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl TryFrom<&str> for TaskState {
    type Error = ParseTaskStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "open" => Ok(Self::Open),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseTaskStateError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived, display-facing task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Open and scheduled today or later.
    Pending,
    /// Open and scheduled before today.
    Overdue,
    /// Completed.
    Completed,
    /// Cancelled.
    Cancelled,
}

impl TaskStatus {
    /// Resolves the derived status from the scheduling fields.
    ///
    /// This is the one definition of "overdue" in the crate. Per-record
    /// display and bulk-list filtering both route through it; store adapters
    /// that translate it into a query predicate must keep the translation
    /// equivalent to this function.
    #[must_use]
    pub fn resolve(scheduled: NaiveDate, completed: Option<NaiveDate>, today: NaiveDate) -> Self {
        if completed.is_some() {
            Self::Completed
        } else if scheduled < today {
            Self::Overdue
        } else {
            Self::Pending
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Overdue => "overdue",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{label}")
    }
}

/// Status predicate accepted by bulk task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// Open tasks scheduled today or later.
    Pending,
    /// Open tasks scheduled before today.
    Overdue,
    /// Completed tasks.
    Completed,
    /// Cancelled tasks.
    Cancelled,
}

impl StatusFilter {
    /// Returns the derived status this filter selects.
    #[must_use]
    pub const fn selects(self) -> TaskStatus {
        match self {
            Self::Pending => TaskStatus::Pending,
            Self::Overdue => TaskStatus::Overdue,
            Self::Completed => TaskStatus::Completed,
            Self::Cancelled => TaskStatus::Cancelled,
        }
    }

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Overdue => "overdue",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}
