//! Repository ports for PM task persistence and site lookups.

use crate::pm::domain::{
    JobId, Machine, MachineId, PmTask, PmTaskId, Room, StatusFilter, UserId, VisibilityScope,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

/// Result type for PM repository operations.
pub type PmRepositoryResult<T> = Result<T, PmRepositoryError>;

/// Field predicates accepted by bulk task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskListFilter {
    /// Restrict to tasks with this derived status.
    pub status: Option<StatusFilter>,
    /// Restrict to tasks assigned to this user.
    pub assigned_to: Option<UserId>,
}

/// Offset/limit pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Number of matching records to skip.
    pub offset: u64,
    /// Maximum number of records to return.
    pub limit: u64,
}

impl Page {
    /// Default page size for bulk listings.
    pub const DEFAULT_LIMIT: u64 = 50;

    /// Creates a page request.
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}

/// One page of a bulk listing, with the total match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOf<T> {
    /// Records in this page, in stable listing order.
    pub items: Vec<T>,
    /// Total number of records matching the predicate.
    pub total: u64,
}

/// PM task persistence contract.
///
/// Implementations own atomicity: [`PmTaskRepository::complete_and_spawn`]
/// must apply its two writes as one unit, and concurrent completions of the
/// same task must serialize so that exactly one succeeds.
#[async_trait]
pub trait PmTaskRepository: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`PmRepositoryError::DuplicateTask`] when the task ID already
    /// exists.
    async fn store(&self, task: &PmTask) -> PmRepositoryResult<()>;

    /// Persists changes to an existing task (reschedule, cancellation).
    ///
    /// # Errors
    ///
    /// Returns [`PmRepositoryError::NotFound`] when the task does not exist.
    async fn update(&self, task: &PmTask) -> PmRepositoryResult<()>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: PmTaskId) -> PmRepositoryResult<Option<PmTask>>;

    /// Lists tasks visible under `scope`, filtered and paginated.
    ///
    /// The visibility predicate and the status filter execute inside the
    /// store; `today` anchors the pending/overdue split exactly as
    /// [`crate::pm::domain::TaskStatus::resolve`] defines it. Ordering is
    /// stable: scheduled date, then task id.
    async fn list_visible(
        &self,
        scope: &VisibilityScope,
        filter: &TaskListFilter,
        page: Page,
        today: NaiveDate,
    ) -> PmRepositoryResult<PageOf<PmTask>>;

    /// Atomically persists a completed task and inserts its follow-on.
    ///
    /// The stored record must still be open when the write applies; a racing
    /// completion that lost the guard observes the completed row.
    ///
    /// # Errors
    ///
    /// Returns [`PmRepositoryError::NotFound`] when the original does not
    /// exist, [`PmRepositoryError::CompletionConflict`] when the stored
    /// record is no longer open, and [`PmRepositoryError::DuplicateTask`]
    /// when the follow-on ID collides. On any error neither write applies.
    async fn complete_and_spawn(
        &self,
        original: &PmTask,
        follow_on: &PmTask,
    ) -> PmRepositoryResult<()>;
}

/// Site lookup contract backing visibility and machine validation.
#[async_trait]
pub trait SiteRepository: Send + Sync {
    /// Returns the machine records for the given identifiers.
    ///
    /// Unknown identifiers are omitted from the result; callers that need
    /// existence checks compare counts.
    async fn machines_by_ids(&self, ids: &[MachineId]) -> PmRepositoryResult<Vec<Machine>>;

    /// Returns the rooms covered by the given job.
    ///
    /// An unknown job yields an empty list: a dangling job reference simply
    /// contributes no visibility path.
    async fn rooms_of_job(&self, job_id: JobId) -> PmRepositoryResult<Vec<Room>>;
}

/// Errors returned by PM repository implementations.
#[derive(Debug, Clone, Error)]
pub enum PmRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(PmTaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(PmTaskId),

    /// The stored task was no longer open when a completion write applied.
    #[error("task {0} was already completed or cancelled")]
    CompletionConflict(PmTaskId),

    /// Underlying persistence failure; surfaced, not retried, by the core.
    #[error("store unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl PmRepositoryError {
    /// Wraps a persistence failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
