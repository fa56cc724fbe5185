//! Scheduling orchestrator composing validation, recurrence, access, and
//! the atomic completion state machine.

use crate::pm::domain::{
    AuthorizationResult, Entitlements, Frequency, JobId, Machine, MachineId, NewPmTask,
    PmDomainError, PmTask, PmTaskId, Priority, PropertyId, Room, TaskState, TaskStatus, UserId,
};
use crate::pm::ports::{
    EntitlementError, EntitlementProvider, Page, PageOf, PmRepositoryError, PmTaskRepository,
    SiteRepository, TaskListFilter,
};
use chrono::NaiveDate;
use mockable::Clock;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Request payload for creating a PM task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePmTaskRequest {
    title: String,
    scheduled_date: NaiveDate,
    frequency: String,
    custom_interval_days: Option<u32>,
    machine_ids: BTreeSet<MachineId>,
    job_id: Option<JobId>,
    assigned_to: Option<UserId>,
    priority: Priority,
}

impl CreatePmTaskRequest {
    /// Creates a request with required fields.
    ///
    /// The frequency is taken by name; unrecognised names fall back to
    /// monthly, while a custom frequency is validated against its interval
    /// when the task is built.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        scheduled_date: NaiveDate,
        frequency: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            scheduled_date,
            frequency: frequency.into(),
            custom_interval_days: None,
            machine_ids: BTreeSet::new(),
            job_id: None,
            assigned_to: None,
            priority: Priority::default(),
        }
    }

    /// Sets the custom interval in days.
    #[must_use]
    pub const fn with_custom_interval(mut self, days: u32) -> Self {
        self.custom_interval_days = Some(days);
        self
    }

    /// Sets the assigned machines.
    #[must_use]
    pub fn with_machines(mut self, machine_ids: impl IntoIterator<Item = MachineId>) -> Self {
        self.machine_ids = machine_ids.into_iter().collect();
        self
    }

    /// Sets the job reference.
    #[must_use]
    pub const fn with_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    /// Sets the assignee.
    #[must_use]
    pub const fn with_assignee(mut self, user: UserId) -> Self {
        self.assigned_to = Some(user);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Transport-facing projection of a PM task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PmTaskView {
    /// Task identifier.
    pub id: PmTaskId,
    /// Task title.
    pub title: String,
    /// Scheduled occurrence date.
    pub scheduled_date: NaiveDate,
    /// Completion date, if completed.
    pub completed_date: Option<NaiveDate>,
    /// Recurrence frequency.
    pub frequency: Frequency,
    /// Interval in days for custom frequencies.
    pub custom_interval_days: Option<u32>,
    /// Next due date, written at completion.
    pub next_due_date: Option<NaiveDate>,
    /// Derived status against the clock at projection time.
    pub status: TaskStatus,
    /// Assigned machines.
    pub machine_ids: Vec<MachineId>,
    /// Property derived from the machine set, if any machines are assigned.
    pub property_id: Option<PropertyId>,
    /// Job reference, if any.
    pub job_id: Option<JobId>,
    /// Assignee, if any.
    pub assigned_to: Option<UserId>,
    /// Creating user.
    pub created_by: UserId,
    /// Urgency classification.
    pub priority: Priority,
}

/// Result of completing a task: the closed record plus its follow-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    /// The completed, now-immutable task.
    pub task: PmTaskView,
    /// Identifier of the spawned follow-on task.
    pub follow_on_id: PmTaskId,
    /// Scheduled date of the spawned follow-on task.
    pub follow_on_scheduled_date: NaiveDate,
}

/// Service-level errors for scheduling operations.
#[derive(Debug, Error)]
pub enum PmSchedulerError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] PmDomainError),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] PmRepositoryError),
    /// Entitlement lookup failed.
    #[error(transparent)]
    Entitlements(#[from] EntitlementError),
    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(PmTaskId),
    /// The acting user has no path into the task.
    #[error("access denied for task {0}")]
    AccessDenied(PmTaskId),
    /// A referenced machine does not exist.
    #[error("machine not found: {0}")]
    MachineNotFound(MachineId),
}

/// Result type for scheduling service operations.
pub type PmSchedulerResult<T> = Result<T, PmSchedulerError>;

/// PM scheduling orchestration service.
pub struct PmSchedulerService<S, E, C>
where
    S: PmTaskRepository + SiteRepository,
    E: EntitlementProvider,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    entitlements: Arc<E>,
    clock: Arc<C>,
}

impl<S, E, C> Clone for PmSchedulerService<S, E, C>
where
    S: PmTaskRepository + SiteRepository,
    E: EntitlementProvider,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            entitlements: Arc::clone(&self.entitlements),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, E, C> PmSchedulerService<S, E, C>
where
    S: PmTaskRepository + SiteRepository,
    E: EntitlementProvider,
    C: Clock + Send + Sync,
{
    /// Creates a new scheduling service.
    #[must_use]
    pub const fn new(store: Arc<S>, entitlements: Arc<E>, clock: Arc<C>) -> Self {
        Self {
            store,
            entitlements,
            clock,
        }
    }

    /// Creates a new open PM task.
    ///
    /// Frequency configuration and the same-property machine invariant are
    /// validated before any write.
    ///
    /// # Errors
    ///
    /// Returns [`PmSchedulerError`] when validation, authorization, or
    /// persistence fails.
    pub async fn create_task(
        &self,
        actor: UserId,
        request: CreatePmTaskRequest,
    ) -> PmSchedulerResult<PmTaskView> {
        let frequency = Frequency::from_name(&request.frequency);
        let machine_ids: Vec<MachineId> = request.machine_ids.iter().copied().collect();
        let machines = self.resolve_machines(&machine_ids).await?;

        let task = PmTask::new(
            NewPmTask {
                title: request.title,
                scheduled_date: request.scheduled_date,
                frequency,
                custom_interval_days: request.custom_interval_days,
                machine_ids: request.machine_ids,
                job_id: request.job_id,
                assigned_to: request.assigned_to,
                created_by: actor,
                priority: request.priority,
            },
            &*self.clock,
        )?;
        let property_id = derive_property(&machines)?;

        let entitlements = self.entitlements.entitlements_for(actor).await?;
        if !self.authorized(&entitlements, &task).await? {
            return Err(PmSchedulerError::AccessDenied(task.id()));
        }

        self.store.store(&task).await?;
        info!(task_id = %task.id(), scheduled = %task.scheduled_date(), "pm task created");
        Ok(self.project(&task, machines, property_id))
    }

    /// Retrieves a task visible to the acting user.
    ///
    /// # Errors
    ///
    /// Returns [`PmSchedulerError::NotFound`] when the task does not exist
    /// and [`PmSchedulerError::AccessDenied`] when the user has no path
    /// into it.
    pub async fn get_task(&self, actor: UserId, id: PmTaskId) -> PmSchedulerResult<PmTaskView> {
        let task = self.load_authorized(actor, id).await?;
        self.to_view(&task).await
    }

    /// Checks visibility of a task without projecting it.
    ///
    /// # Errors
    ///
    /// Returns [`PmSchedulerError`] only for store or entitlement failures;
    /// existence and permission outcomes are values, not errors.
    pub async fn check_access(
        &self,
        actor: UserId,
        id: PmTaskId,
    ) -> PmSchedulerResult<AuthorizationResult> {
        let Some(task) = self.store.find_by_id(id).await? else {
            return Ok(AuthorizationResult::NotFound);
        };
        let entitlements = self.entitlements.entitlements_for(actor).await?;
        if self.authorized(&entitlements, &task).await? {
            Ok(AuthorizationResult::Allowed)
        } else {
            Ok(AuthorizationResult::Denied)
        }
    }

    /// Lists tasks visible to the acting user, filtered and paginated.
    ///
    /// The visibility and status predicates execute inside the store.
    ///
    /// # Errors
    ///
    /// Returns [`PmSchedulerError`] when a store or entitlement lookup
    /// fails.
    pub async fn list_tasks(
        &self,
        actor: UserId,
        filter: TaskListFilter,
        page: Page,
    ) -> PmSchedulerResult<PageOf<PmTaskView>> {
        let entitlements = self.entitlements.entitlements_for(actor).await?;
        let today = self.today();
        let listed = self
            .store
            .list_visible(&entitlements.scope(), &filter, page, today)
            .await?;

        let mut items = Vec::with_capacity(listed.items.len());
        for task in &listed.items {
            items.push(self.to_view(task).await?);
        }
        Ok(PageOf {
            items,
            total: listed.total,
        })
    }

    /// Completes a task and spawns its follow-on occurrence.
    ///
    /// The completion date defaults to today. Both writes apply as one
    /// atomic store unit; a racing duplicate completion observes the
    /// completed record and fails with
    /// [`PmDomainError::InvalidTransition`].
    ///
    /// # Errors
    ///
    /// Returns [`PmSchedulerError`] when the task is missing or invisible,
    /// the completion date is outside the tolerance window, the task is not
    /// open, or persistence fails.
    pub async fn complete_task(
        &self,
        actor: UserId,
        id: PmTaskId,
        completed_on: Option<NaiveDate>,
    ) -> PmSchedulerResult<CompletionOutcome> {
        let mut task = self.load_authorized(actor, id).await?;
        let completed_date = completed_on.unwrap_or_else(|| self.today());
        let follow_on = task.complete(completed_date, actor, &*self.clock)?;

        match self.store.complete_and_spawn(&task, &follow_on).await {
            Ok(()) => {}
            Err(PmRepositoryError::CompletionConflict(conflicted)) => {
                return Err(self.conflict_to_transition(conflicted).await);
            }
            Err(PmRepositoryError::NotFound(missing)) => {
                return Err(PmSchedulerError::NotFound(missing));
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            task_id = %task.id(),
            follow_on_id = %follow_on.id(),
            follow_on_scheduled = %follow_on.scheduled_date(),
            "pm task completed"
        );
        let view = self.to_view(&task).await?;
        Ok(CompletionOutcome {
            task: view,
            follow_on_id: follow_on.id(),
            follow_on_scheduled_date: follow_on.scheduled_date(),
        })
    }

    /// Cancels an open task. Terminal; no follow-on is created.
    ///
    /// # Errors
    ///
    /// Returns [`PmSchedulerError`] when the task is missing, invisible,
    /// not open, or persistence fails.
    pub async fn cancel_task(&self, actor: UserId, id: PmTaskId) -> PmSchedulerResult<PmTaskView> {
        let mut task = self.load_authorized(actor, id).await?;
        task.cancel(&*self.clock)?;
        self.store.update(&task).await?;
        info!(task_id = %task.id(), "pm task cancelled");
        self.to_view(&task).await
    }

    /// Moves the scheduled date of an open task.
    ///
    /// # Errors
    ///
    /// Returns [`PmSchedulerError`] when the task is missing, invisible, in
    /// a terminal state ([`PmDomainError::TaskImmutable`]), or persistence
    /// fails.
    pub async fn reschedule_task(
        &self,
        actor: UserId,
        id: PmTaskId,
        new_scheduled_date: NaiveDate,
    ) -> PmSchedulerResult<PmTaskView> {
        let mut task = self.load_authorized(actor, id).await?;
        task.reschedule(new_scheduled_date, &*self.clock)?;
        self.store.update(&task).await?;
        debug!(task_id = %task.id(), scheduled = %new_scheduled_date, "pm task rescheduled");
        self.to_view(&task).await
    }

    /// Returns the current calendar day from the injected clock.
    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.utc().date_naive()
    }

    async fn load_authorized(
        &self,
        actor: UserId,
        id: PmTaskId,
    ) -> PmSchedulerResult<PmTask> {
        let task = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(PmSchedulerError::NotFound(id))?;
        let entitlements = self.entitlements.entitlements_for(actor).await?;
        if !self.authorized(&entitlements, &task).await? {
            return Err(PmSchedulerError::AccessDenied(id));
        }
        Ok(task)
    }

    async fn authorized(
        &self,
        entitlements: &Entitlements,
        task: &PmTask,
    ) -> PmSchedulerResult<bool> {
        if entitlements.is_privileged() {
            return Ok(true);
        }
        let machine_ids: Vec<MachineId> = task.machine_ids().iter().copied().collect();
        let machine_properties: Vec<PropertyId> = self
            .store
            .machines_by_ids(&machine_ids)
            .await?
            .iter()
            .map(Machine::property_id)
            .collect();
        let room_properties: Vec<PropertyId> = match task.job_id() {
            Some(job_id) => self
                .store
                .rooms_of_job(job_id)
                .await?
                .iter()
                .map(Room::property_id)
                .collect(),
            None => Vec::new(),
        };
        Ok(entitlements.may_view(&machine_properties, &room_properties))
    }

    async fn resolve_machines(&self, ids: &[MachineId]) -> PmSchedulerResult<Vec<Machine>> {
        let machines = self.store.machines_by_ids(ids).await?;
        for id in ids {
            if !machines.iter().any(|machine| machine.id() == *id) {
                return Err(PmSchedulerError::MachineNotFound(*id));
            }
        }
        Ok(machines)
    }

    async fn to_view(&self, task: &PmTask) -> PmSchedulerResult<PmTaskView> {
        let machine_ids: Vec<MachineId> = task.machine_ids().iter().copied().collect();
        let machines = self.resolve_machines(&machine_ids).await?;
        let property_id = derive_property(&machines)?;
        Ok(self.project(task, machines, property_id))
    }

    fn project(
        &self,
        task: &PmTask,
        machines: Vec<Machine>,
        property_id: Option<PropertyId>,
    ) -> PmTaskView {
        PmTaskView {
            id: task.id(),
            title: task.title().to_owned(),
            scheduled_date: task.scheduled_date(),
            completed_date: task.completed_date(),
            frequency: task.frequency(),
            custom_interval_days: task.custom_interval_days(),
            next_due_date: task.next_due_date(),
            status: task.status(self.today()),
            machine_ids: machines.iter().map(Machine::id).collect(),
            property_id,
            job_id: task.job_id(),
            assigned_to: task.assigned_to(),
            created_by: task.created_by(),
            priority: task.priority(),
        }
    }

    /// Maps a lost completion race to the transition error the caller would
    /// have seen had it read the store after the winner committed.
    async fn conflict_to_transition(&self, id: PmTaskId) -> PmSchedulerError {
        match self.store.find_by_id(id).await {
            Ok(Some(current)) => PmSchedulerError::Domain(PmDomainError::InvalidTransition {
                task_id: id,
                from: current.state(),
                to: TaskState::Completed,
            }),
            Ok(None) => PmSchedulerError::NotFound(id),
            Err(err) => err.into(),
        }
    }
}

/// Derives the single owning property of a machine set.
///
/// # Errors
///
/// Returns [`PmDomainError::CrossPropertyMachineSet`] when the machines
/// span more than one property.
fn derive_property(machines: &[Machine]) -> Result<Option<PropertyId>, PmDomainError> {
    let mut owner: Option<PropertyId> = None;
    for machine in machines {
        match owner {
            None => owner = Some(machine.property_id()),
            Some(existing) if existing != machine.property_id() => {
                return Err(PmDomainError::CrossPropertyMachineSet {
                    properties: vec![existing, machine.property_id()],
                    machine_id: machine.id(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(owner)
}
