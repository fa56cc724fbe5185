//! Error types for preventive-maintenance domain validation and parsing.

use super::{MachineId, PmTaskId, PropertyId, TaskState};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors returned while validating or mutating domain PM values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PmDomainError {
    /// A custom frequency was configured without a positive day interval.
    #[error("custom frequency requires a positive custom_interval_days, got {interval:?}")]
    InvalidFrequencyConfig {
        /// The rejected interval value, if one was supplied at all.
        interval: Option<u32>,
    },

    /// The machines assigned to one task do not share a single property.
    #[error("machines assigned to one task must belong to one property, found {properties:?}")]
    CrossPropertyMachineSet {
        /// The distinct properties spanned by the machine set.
        properties: Vec<PropertyId>,
        /// The machine that introduced the second property.
        machine_id: MachineId,
    },

    /// The proposed completion date falls outside the tolerance window.
    #[error("completion date is {days_away} days away from the scheduled date")]
    CompletionOutOfWindow {
        /// Absolute day offset between completion and scheduled date.
        days_away: i64,
    },

    /// The requested state change is illegal from the current state.
    #[error("task {task_id} cannot transition from {from} to {to}")]
    InvalidTransition {
        /// Task whose transition was rejected.
        task_id: PmTaskId,
        /// Stored state at the time of the attempt.
        from: TaskState,
        /// Requested target state.
        to: TaskState,
    },

    /// A mutation was attempted on a terminal-state task.
    #[error("task {0} is immutable in its terminal state")]
    TaskImmutable(PmTaskId),

    /// Recurrence arithmetic overflowed the supported calendar range.
    #[error("no representable next occurrence after {0}")]
    DateOutOfRange(NaiveDate),
}

/// Error returned while parsing task states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task state: {0}")]
pub struct ParseTaskStateError(pub String);

/// Error returned while parsing frequencies from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown frequency: {0}")]
pub struct ParseFrequencyError(pub String);

/// Error returned while parsing priorities from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown priority: {0}")]
pub struct ParsePriorityError(pub String);
