//! Thread-safe in-memory implementation of the PM ports.
//!
//! One `RwLock` guards all records, so the two writes of
//! `complete_and_spawn` are atomic and racing completions serialize on the
//! write lock: the loser re-reads the stored state and fails with
//! [`PmRepositoryError::CompletionConflict`].

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::pm::domain::{
    Entitlements, Job, JobId, Machine, MachineId, PmTask, PmTaskId, Property, PropertyId, Room,
    RoomId, TaskState, UserId, VisibilityScope,
};
use crate::pm::ports::{
    EntitlementProvider, EntitlementResult, Page, PageOf, PmRepositoryError, PmRepositoryResult,
    PmTaskRepository, SiteRepository, TaskListFilter,
};

/// Thread-safe in-memory PM store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPmStore {
    state: Arc<RwLock<PmStoreState>>,
}

#[derive(Debug, Default)]
struct PmStoreState {
    tasks: HashMap<PmTaskId, PmTask>,
    machines: HashMap<MachineId, Machine>,
    rooms: HashMap<RoomId, Room>,
    jobs: HashMap<JobId, Job>,
    properties: HashMap<PropertyId, Property>,
    privileged_users: HashSet<UserId>,
}

impl InMemoryPmStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a property record.
    ///
    /// # Errors
    ///
    /// Returns [`PmRepositoryError::Unavailable`] when the lock is poisoned.
    pub fn insert_property(&self, property: Property) -> PmRepositoryResult<()> {
        let mut state = write_state(&self.state)?;
        state.properties.insert(property.id(), property);
        Ok(())
    }

    /// Seeds a room record.
    ///
    /// # Errors
    ///
    /// Returns [`PmRepositoryError::Unavailable`] when the lock is poisoned.
    pub fn insert_room(&self, room: Room) -> PmRepositoryResult<()> {
        let mut state = write_state(&self.state)?;
        state.rooms.insert(room.id(), room);
        Ok(())
    }

    /// Seeds a job record.
    ///
    /// # Errors
    ///
    /// Returns [`PmRepositoryError::Unavailable`] when the lock is poisoned.
    pub fn insert_job(&self, job: Job) -> PmRepositoryResult<()> {
        let mut state = write_state(&self.state)?;
        state.jobs.insert(job.id(), job);
        Ok(())
    }

    /// Seeds a machine record.
    ///
    /// # Errors
    ///
    /// Returns [`PmRepositoryError::Unavailable`] when the lock is poisoned.
    pub fn insert_machine(&self, machine: Machine) -> PmRepositoryResult<()> {
        let mut state = write_state(&self.state)?;
        state.machines.insert(machine.id(), machine);
        Ok(())
    }

    /// Marks a user as privileged, bypassing the visibility filter.
    ///
    /// # Errors
    ///
    /// Returns [`PmRepositoryError::Unavailable`] when the lock is poisoned.
    pub fn grant_privileged(&self, user: UserId) -> PmRepositoryResult<()> {
        let mut state = write_state(&self.state)?;
        state.privileged_users.insert(user);
        Ok(())
    }

    /// Returns the number of stored tasks.
    ///
    /// # Errors
    ///
    /// Returns [`PmRepositoryError::Unavailable`] when the lock is poisoned.
    pub fn task_count(&self) -> PmRepositoryResult<usize> {
        let state = read_state(&self.state)?;
        Ok(state.tasks.len())
    }
}

fn read_state(
    state: &Arc<RwLock<PmStoreState>>,
) -> PmRepositoryResult<std::sync::RwLockReadGuard<'_, PmStoreState>> {
    state
        .read()
        .map_err(|err| PmRepositoryError::unavailable(std::io::Error::other(err.to_string())))
}

fn write_state(
    state: &Arc<RwLock<PmStoreState>>,
) -> PmRepositoryResult<std::sync::RwLockWriteGuard<'_, PmStoreState>> {
    state
        .write()
        .map_err(|err| PmRepositoryError::unavailable(std::io::Error::other(err.to_string())))
}

/// Resolves the property paths of a task against the seeded site records.
fn property_paths(state: &PmStoreState, task: &PmTask) -> (Vec<PropertyId>, Vec<PropertyId>) {
    let machine_properties = task
        .machine_ids()
        .iter()
        .filter_map(|machine_id| state.machines.get(machine_id))
        .map(Machine::property_id)
        .collect();
    let room_properties = task
        .job_id()
        .and_then(|job_id| state.jobs.get(&job_id))
        .map(|job| {
            job.room_ids()
                .iter()
                .filter_map(|room_id| state.rooms.get(room_id))
                .map(Room::property_id)
                .collect()
        })
        .unwrap_or_default();
    (machine_properties, room_properties)
}

fn matches_filter(task: &PmTask, filter: &TaskListFilter, today: NaiveDate) -> bool {
    let status_matches = filter
        .status
        .is_none_or(|wanted| task.status(today) == wanted.selects());
    let assignee_matches = filter
        .assigned_to
        .is_none_or(|user| task.assigned_to() == Some(user));
    status_matches && assignee_matches
}

#[async_trait]
impl PmTaskRepository for InMemoryPmStore {
    async fn store(&self, task: &PmTask) -> PmRepositoryResult<()> {
        let mut state = write_state(&self.state)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(PmRepositoryError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update(&self, task: &PmTask) -> PmRepositoryResult<()> {
        let mut state = write_state(&self.state)?;
        if !state.tasks.contains_key(&task.id()) {
            return Err(PmRepositoryError::NotFound(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: PmTaskId) -> PmRepositoryResult<Option<PmTask>> {
        let state = read_state(&self.state)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn list_visible(
        &self,
        scope: &VisibilityScope,
        filter: &TaskListFilter,
        page: Page,
        today: NaiveDate,
    ) -> PmRepositoryResult<PageOf<PmTask>> {
        let state = read_state(&self.state)?;
        let mut matching: Vec<PmTask> = state
            .tasks
            .values()
            .filter(|task| {
                let (machine_properties, room_properties) = property_paths(&state, task);
                scope.permits(&machine_properties, &room_properties)
                    && matches_filter(task, filter, today)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|task| (task.scheduled_date(), task.id()));

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        let items = matching.into_iter().skip(offset).take(limit).collect();
        Ok(PageOf { items, total })
    }

    async fn complete_and_spawn(
        &self,
        original: &PmTask,
        follow_on: &PmTask,
    ) -> PmRepositoryResult<()> {
        let mut state = write_state(&self.state)?;

        let stored_state = state
            .tasks
            .get(&original.id())
            .map(PmTask::state)
            .ok_or(PmRepositoryError::NotFound(original.id()))?;
        if stored_state != TaskState::Open {
            return Err(PmRepositoryError::CompletionConflict(original.id()));
        }
        if state.tasks.contains_key(&follow_on.id()) {
            return Err(PmRepositoryError::DuplicateTask(follow_on.id()));
        }

        state.tasks.insert(original.id(), original.clone());
        state.tasks.insert(follow_on.id(), follow_on.clone());
        Ok(())
    }
}

#[async_trait]
impl SiteRepository for InMemoryPmStore {
    async fn machines_by_ids(&self, ids: &[MachineId]) -> PmRepositoryResult<Vec<Machine>> {
        let state = read_state(&self.state)?;
        Ok(ids
            .iter()
            .filter_map(|id| state.machines.get(id))
            .cloned()
            .collect())
    }

    async fn rooms_of_job(&self, job_id: JobId) -> PmRepositoryResult<Vec<Room>> {
        let state = read_state(&self.state)?;
        Ok(state
            .jobs
            .get(&job_id)
            .map(|job| {
                job.room_ids()
                    .iter()
                    .filter_map(|room_id| state.rooms.get(room_id))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl EntitlementProvider for InMemoryPmStore {
    async fn entitlements_for(&self, user: UserId) -> EntitlementResult<Entitlements> {
        let state = read_state(&self.state).map_err(|err| {
            crate::pm::ports::EntitlementError::unavailable(std::io::Error::other(err.to_string()))
        })?;
        let is_privileged = state.privileged_users.contains(&user);
        let property_ids: Vec<PropertyId> = state
            .properties
            .values()
            .filter(|property| property.entitles(user))
            .map(Property::id)
            .collect();
        Ok(Entitlements::new(user, is_privileged, property_ids))
    }
}
