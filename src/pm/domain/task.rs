//! PM task aggregate root and its lifecycle state machine.

use super::{
    CompletionWindow, Frequency, JobId, MachineId, ParsePriorityError, PmDomainError, PmTaskId,
    TaskState, TaskStatus, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Urgency classification of a PM task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Routine maintenance.
    Low,
    /// Standard maintenance.
    #[default]
    Medium,
    /// Urgent maintenance.
    High,
}

impl Priority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl TryFrom<&str> for Priority {
    type Error = ParsePriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParsePriorityError(value.to_owned())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// PM task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmTask {
    id: PmTaskId,
    title: String,
    scheduled_date: NaiveDate,
    completed_date: Option<NaiveDate>,
    frequency: Frequency,
    custom_interval_days: Option<u32>,
    next_due_date: Option<NaiveDate>,
    state: TaskState,
    machine_ids: BTreeSet<MachineId>,
    job_id: Option<JobId>,
    assigned_to: Option<UserId>,
    created_by: UserId,
    priority: Priority,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for creating a new open PM task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPmTask {
    /// Task title.
    pub title: String,
    /// First scheduled occurrence.
    pub scheduled_date: NaiveDate,
    /// Recurrence frequency.
    pub frequency: Frequency,
    /// Interval in days, meaningful only for [`Frequency::Custom`].
    pub custom_interval_days: Option<u32>,
    /// Machines the task applies to.
    pub machine_ids: BTreeSet<MachineId>,
    /// Job grouping the rooms the task applies to.
    pub job_id: Option<JobId>,
    /// Assigned user, if any.
    pub assigned_to: Option<UserId>,
    /// Creating user.
    pub created_by: UserId,
    /// Urgency classification.
    pub priority: Priority,
}

/// Parameter object for reconstructing a persisted PM task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPmTaskData {
    /// Persisted task identifier.
    pub id: PmTaskId,
    /// Persisted title.
    pub title: String,
    /// Persisted scheduled occurrence.
    pub scheduled_date: NaiveDate,
    /// Persisted completion date, if completed.
    pub completed_date: Option<NaiveDate>,
    /// Persisted recurrence frequency.
    pub frequency: Frequency,
    /// Persisted custom interval, if any.
    pub custom_interval_days: Option<u32>,
    /// Persisted next due date, set only after completion.
    pub next_due_date: Option<NaiveDate>,
    /// Persisted lifecycle state.
    pub state: TaskState,
    /// Persisted machine assignment.
    pub machine_ids: BTreeSet<MachineId>,
    /// Persisted job reference, if any.
    pub job_id: Option<JobId>,
    /// Persisted assignee, if any.
    pub assigned_to: Option<UserId>,
    /// Persisted creating user.
    pub created_by: UserId,
    /// Persisted priority.
    pub priority: Priority,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest lifecycle timestamp.
    pub updated_at: DateTime<Utc>,
}

impl PmTask {
    /// Creates a new open task.
    ///
    /// # Errors
    ///
    /// Returns [`PmDomainError::InvalidFrequencyConfig`] when a custom
    /// frequency lacks a positive interval. Cross-property machine
    /// validation needs store lookups and is enforced by the orchestrator
    /// before this constructor runs.
    pub fn new(spec: NewPmTask, clock: &impl Clock) -> Result<Self, PmDomainError> {
        spec.frequency.validate_interval(spec.custom_interval_days)?;
        let timestamp = clock.utc();
        Ok(Self {
            id: PmTaskId::new(),
            title: spec.title,
            scheduled_date: spec.scheduled_date,
            completed_date: None,
            frequency: spec.frequency,
            custom_interval_days: spec.custom_interval_days,
            next_due_date: None,
            state: TaskState::Open,
            machine_ids: spec.machine_ids,
            job_id: spec.job_id,
            assigned_to: spec.assigned_to,
            created_by: spec.created_by,
            priority: spec.priority,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedPmTaskData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            scheduled_date: data.scheduled_date,
            completed_date: data.completed_date,
            frequency: data.frequency,
            custom_interval_days: data.custom_interval_days,
            next_due_date: data.next_due_date,
            state: data.state,
            machine_ids: data.machine_ids,
            job_id: data.job_id,
            assigned_to: data.assigned_to,
            created_by: data.created_by,
            priority: data.priority,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> PmTaskId {
        self.id
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the scheduled occurrence date.
    #[must_use]
    pub const fn scheduled_date(&self) -> NaiveDate {
        self.scheduled_date
    }

    /// Returns the completion date, if completed.
    #[must_use]
    pub const fn completed_date(&self) -> Option<NaiveDate> {
        self.completed_date
    }

    /// Returns the recurrence frequency.
    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Returns the custom interval in days, if configured.
    #[must_use]
    pub const fn custom_interval_days(&self) -> Option<u32> {
        self.custom_interval_days
    }

    /// Returns the next due date, set only after completion.
    #[must_use]
    pub const fn next_due_date(&self) -> Option<NaiveDate> {
        self.next_due_date
    }

    /// Returns the stored lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns the assigned machines.
    #[must_use]
    pub const fn machine_ids(&self) -> &BTreeSet<MachineId> {
        &self.machine_ids
    }

    /// Returns the job reference, if any.
    #[must_use]
    pub const fn job_id(&self) -> Option<JobId> {
        self.job_id
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assigned_to(&self) -> Option<UserId> {
        self.assigned_to
    }

    /// Returns the creating user.
    #[must_use]
    pub const fn created_by(&self) -> UserId {
        self.created_by
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Derives the display status against the given calendar day.
    #[must_use]
    pub fn status(&self, today: NaiveDate) -> TaskStatus {
        match self.state {
            TaskState::Cancelled => TaskStatus::Cancelled,
            TaskState::Open | TaskState::Completed => {
                TaskStatus::resolve(self.scheduled_date, self.completed_date, today)
            }
        }
    }

    /// Completes the task and returns the spawned follow-on occurrence.
    ///
    /// The next anchor is computed from `completed_on`, never from the
    /// original scheduled date. The follow-on inherits title, frequency,
    /// machine assignment, job, assignee, and priority; its `created_by` is
    /// the completing `actor`. The caller must persist both records as one
    /// atomic unit.
    ///
    /// # Errors
    ///
    /// Returns [`PmDomainError::InvalidTransition`] when the task is not
    /// open, [`PmDomainError::CompletionOutOfWindow`] when `completed_on`
    /// falls outside the tolerance window, and recurrence-configuration
    /// errors from the calculator. On error the task is unchanged.
    pub fn complete(
        &mut self,
        completed_on: NaiveDate,
        actor: UserId,
        clock: &impl Clock,
    ) -> Result<Self, PmDomainError> {
        self.guard_transition(TaskState::Completed)?;
        CompletionWindow::default().validate(self.scheduled_date, completed_on)?;
        let next_due = self
            .frequency
            .next_occurrence(completed_on, self.custom_interval_days)?;

        let timestamp = clock.utc();
        self.completed_date = Some(completed_on);
        self.next_due_date = Some(next_due);
        self.state = TaskState::Completed;
        self.updated_at = timestamp;

        Ok(Self {
            id: PmTaskId::new(),
            title: self.title.clone(),
            scheduled_date: next_due,
            completed_date: None,
            frequency: self.frequency,
            custom_interval_days: self.custom_interval_days,
            next_due_date: None,
            state: TaskState::Open,
            machine_ids: self.machine_ids.clone(),
            job_id: self.job_id,
            assigned_to: self.assigned_to,
            created_by: actor,
            priority: self.priority,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Cancels the task. Terminal; no follow-on is created.
    ///
    /// # Errors
    ///
    /// Returns [`PmDomainError::InvalidTransition`] when the task is not
    /// open.
    pub fn cancel(&mut self, clock: &impl Clock) -> Result<(), PmDomainError> {
        self.guard_transition(TaskState::Cancelled)?;
        self.state = TaskState::Cancelled;
        self.touch(clock);
        Ok(())
    }

    /// Moves the scheduled date of an open task.
    ///
    /// # Errors
    ///
    /// Returns [`PmDomainError::TaskImmutable`] when the task is in a
    /// terminal state.
    pub fn reschedule(
        &mut self,
        new_scheduled_date: NaiveDate,
        clock: &impl Clock,
    ) -> Result<(), PmDomainError> {
        if self.state.is_terminal() {
            return Err(PmDomainError::TaskImmutable(self.id));
        }
        self.scheduled_date = new_scheduled_date;
        self.touch(clock);
        Ok(())
    }

    /// Rejects any transition that does not start from the open state.
    fn guard_transition(&self, to: TaskState) -> Result<(), PmDomainError> {
        if self.state != TaskState::Open {
            return Err(PmDomainError::InvalidTransition {
                task_id: self.id,
                from: self.state,
                to,
            });
        }
        Ok(())
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
