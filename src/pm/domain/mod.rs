//! Domain model for preventive-maintenance scheduling.
//!
//! The PM domain models recurring task creation, recurrence arithmetic,
//! derived status, completion-window validation, property-scoped visibility,
//! and the completion state machine, keeping all infrastructure concerns
//! outside of the domain boundary.

mod access;
mod error;
mod frequency;
mod ids;
mod site;
mod status;
mod task;
mod window;

pub use access::{AuthorizationResult, Entitlements, VisibilityScope};
pub use error::{
    ParseFrequencyError, ParsePriorityError, ParseTaskStateError, PmDomainError,
};
pub use frequency::Frequency;
pub use ids::{JobId, MachineId, PmTaskId, PropertyId, RoomId, UserId};
pub use site::{Job, Machine, Property, Room};
pub use status::{StatusFilter, TaskState, TaskStatus};
pub use task::{NewPmTask, PersistedPmTaskData, PmTask, Priority};
pub use window::{COMPLETION_WINDOW_DAYS, CompletionWindow};
