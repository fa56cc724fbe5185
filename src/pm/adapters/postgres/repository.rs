//! `PostgreSQL` implementation of the PM ports.

use super::{
    models::{MachineRow, PmTaskRow, PmTaskWriteRow, RoomRow},
    schema::{machines, pm_tasks},
};
use crate::pm::domain::{
    Entitlements, Frequency, JobId, Machine, MachineId, PersistedPmTaskData, PmTask, PmTaskId,
    Priority, PropertyId, Room, RoomId, StatusFilter, TaskState, UserId, VisibilityScope,
};
use crate::pm::ports::{
    EntitlementError, EntitlementProvider, EntitlementResult, Page, PageOf, PmRepositoryError,
    PmRepositoryResult, PmTaskRepository, SiteRepository, TaskListFilter,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Array, BigInt, Bool, Date, Nullable, Text, Uuid as SqlUuid};
use std::collections::BTreeSet;

/// `PostgreSQL` connection pool type used by PM adapters.
pub type PmPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed PM store.
#[derive(Debug, Clone)]
pub struct PostgresPmStore {
    pool: PmPgPool,
}

impl From<DieselError> for PmRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::unavailable(err)
    }
}

impl PostgresPmStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PmPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> PmRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> PmRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(PmRepositoryError::unavailable)?;
            f(&mut connection)
        })
        .await
        .map_err(PmRepositoryError::unavailable)?
    }
}

/// Shared WHERE clause for visible-task queries.
///
/// `$1` unrestricted flag, `$2` entitled property ids, `$3` status filter,
/// `$4` assignee filter, `$5` today. The status branch is the SQL
/// translation of `TaskStatus::resolve` and must stay equivalent to it. The
/// two `EXISTS` branches are the machine and job-room property paths, ORed.
const VISIBLE_TASKS_WHERE: &str = concat!(
    "($1 ",
    " OR EXISTS (SELECT 1 FROM machines m ",
    "            WHERE m.property_id = ANY($2) AND t.machine_ids ? m.id::text) ",
    " OR EXISTS (SELECT 1 FROM jobs j ",
    "            JOIN rooms r ON j.room_ids ? r.id::text ",
    "            WHERE j.id = t.job_id AND r.property_id = ANY($2))) ",
    "AND ($3::text IS NULL ",
    "     OR ($3 = 'completed' AND t.state = 'completed') ",
    "     OR ($3 = 'cancelled' AND t.state = 'cancelled') ",
    "     OR ($3 = 'pending' AND t.state = 'open' AND t.scheduled_date >= $5::date) ",
    "     OR ($3 = 'overdue' AND t.state = 'open' AND t.scheduled_date < $5::date)) ",
    "AND ($4::uuid IS NULL OR t.assigned_to = $4)",
);

#[derive(Debug, QueryableByName)]
struct TotalRow {
    #[diesel(sql_type = BigInt)]
    total: i64,
}

#[async_trait]
impl PmTaskRepository for PostgresPmStore {
    async fn store(&self, task: &PmTask) -> PmRepositoryResult<()> {
        let task_id = task.id();
        let row = to_write_row(task)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(pm_tasks::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        PmRepositoryError::DuplicateTask(task_id)
                    }
                    _ => PmRepositoryError::unavailable(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, task: &PmTask) -> PmRepositoryResult<()> {
        let task_id = task.id();
        let row = to_write_row(task)?;
        self.run_blocking(move |connection| {
            let updated =
                diesel::update(pm_tasks::table.filter(pm_tasks::id.eq(task_id.into_inner())))
                    .set(&row)
                    .execute(connection)?;
            if updated == 0 {
                return Err(PmRepositoryError::NotFound(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: PmTaskId) -> PmRepositoryResult<Option<PmTask>> {
        self.run_blocking(move |connection| {
            let row = pm_tasks::table
                .filter(pm_tasks::id.eq(id.into_inner()))
                .select(PmTaskRow::as_select())
                .first::<PmTaskRow>(connection)
                .optional()?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list_visible(
        &self,
        scope: &VisibilityScope,
        filter: &TaskListFilter,
        page: Page,
        today: NaiveDate,
    ) -> PmRepositoryResult<PageOf<PmTask>> {
        let (unrestricted, entitled): (bool, Vec<uuid::Uuid>) = match scope {
            VisibilityScope::Unrestricted => (true, Vec::new()),
            VisibilityScope::Properties(ids) => (
                false,
                ids.iter().map(|id| PropertyId::into_inner(*id)).collect(),
            ),
        };
        let status = filter.status.map(|s| StatusFilter::as_str(s).to_owned());
        let assignee = filter.assigned_to.map(UserId::into_inner);
        let limit = i64::try_from(page.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(page.offset).unwrap_or(i64::MAX);

        self.run_blocking(move |connection| {
            let items_sql = format!(
                "SELECT t.* FROM pm_tasks t WHERE {VISIBLE_TASKS_WHERE} \
                 ORDER BY t.scheduled_date, t.id LIMIT $6 OFFSET $7"
            );
            let rows = diesel::sql_query(items_sql)
                .bind::<Bool, _>(unrestricted)
                .bind::<Array<SqlUuid>, _>(entitled.clone())
                .bind::<Nullable<Text>, _>(status.clone())
                .bind::<Nullable<SqlUuid>, _>(assignee)
                .bind::<Date, _>(today)
                .bind::<BigInt, _>(limit)
                .bind::<BigInt, _>(offset)
                .load::<PmTaskRow>(connection)?;

            let count_sql =
                format!("SELECT COUNT(*) AS total FROM pm_tasks t WHERE {VISIBLE_TASKS_WHERE}");
            let total_row = diesel::sql_query(count_sql)
                .bind::<Bool, _>(unrestricted)
                .bind::<Array<SqlUuid>, _>(entitled)
                .bind::<Nullable<Text>, _>(status)
                .bind::<Nullable<SqlUuid>, _>(assignee)
                .bind::<Date, _>(today)
                .get_result::<TotalRow>(connection)?;

            let items = rows
                .into_iter()
                .map(row_to_task)
                .collect::<PmRepositoryResult<Vec<_>>>()?;
            let total = u64::try_from(total_row.total).unwrap_or(0);
            Ok(PageOf { items, total })
        })
        .await
    }

    async fn complete_and_spawn(
        &self,
        original: &PmTask,
        follow_on: &PmTask,
    ) -> PmRepositoryResult<()> {
        let original_id = original.id();
        let follow_on_id = follow_on.id();
        let original_row = to_write_row(original)?;
        let follow_on_row = to_write_row(follow_on)?;

        self.run_blocking(move |connection| {
            connection.transaction::<_, PmRepositoryError, _>(|connection| {
                // The state guard on the UPDATE serializes racing
                // completions: the loser updates zero rows and the
                // follow-on insert never runs.
                let updated = diesel::update(
                    pm_tasks::table.filter(
                        pm_tasks::id
                            .eq(original_id.into_inner())
                            .and(pm_tasks::state.eq(TaskState::Open.as_str())),
                    ),
                )
                .set(&original_row)
                .execute(connection)?;

                if updated == 0 {
                    let existing: i64 = pm_tasks::table
                        .filter(pm_tasks::id.eq(original_id.into_inner()))
                        .count()
                        .get_result(connection)?;
                    return Err(if existing == 0 {
                        PmRepositoryError::NotFound(original_id)
                    } else {
                        PmRepositoryError::CompletionConflict(original_id)
                    });
                }

                diesel::insert_into(pm_tasks::table)
                    .values(&follow_on_row)
                    .execute(connection)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            PmRepositoryError::DuplicateTask(follow_on_id)
                        }
                        _ => PmRepositoryError::unavailable(err),
                    })?;
                Ok(())
            })
        })
        .await
    }
}

#[async_trait]
impl SiteRepository for PostgresPmStore {
    async fn machines_by_ids(&self, ids: &[MachineId]) -> PmRepositoryResult<Vec<Machine>> {
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| MachineId::into_inner(*id)).collect();
        self.run_blocking(move |connection| {
            let rows = machines::table
                .filter(machines::id.eq_any(uuids))
                .select(MachineRow::as_select())
                .load::<MachineRow>(connection)?;
            Ok(rows
                .into_iter()
                .map(|row| {
                    Machine::new(
                        MachineId::from_uuid(row.id),
                        row.name,
                        PropertyId::from_uuid(row.property_id),
                    )
                })
                .collect())
        })
        .await
    }

    async fn rooms_of_job(&self, job_id: JobId) -> PmRepositoryResult<Vec<Room>> {
        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(concat!(
                "SELECT r.id, r.property_id FROM rooms r ",
                "JOIN jobs j ON j.room_ids ? r.id::text ",
                "WHERE j.id = $1",
            ))
            .bind::<SqlUuid, _>(job_id.into_inner())
            .load::<RoomRow>(connection)?;
            Ok(rows
                .into_iter()
                .map(|row| {
                    Room::new(
                        RoomId::from_uuid(row.id),
                        PropertyId::from_uuid(row.property_id),
                    )
                })
                .collect())
        })
        .await
    }
}

#[derive(Debug, QueryableByName)]
struct PrivilegedRow {
    #[diesel(sql_type = Bool)]
    privileged: bool,
}

#[derive(Debug, QueryableByName)]
struct PropertyIdRow {
    #[diesel(sql_type = SqlUuid)]
    id: uuid::Uuid,
}

#[async_trait]
impl EntitlementProvider for PostgresPmStore {
    async fn entitlements_for(&self, user: UserId) -> EntitlementResult<Entitlements> {
        let pool = self.pool.clone();
        let user_uuid = user.into_inner();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(EntitlementError::unavailable)?;
            let privileged = diesel::sql_query(
                "SELECT EXISTS (SELECT 1 FROM privileged_users WHERE user_id = $1) AS privileged",
            )
            .bind::<SqlUuid, _>(user_uuid)
            .get_result::<PrivilegedRow>(&mut connection)
            .map_err(EntitlementError::unavailable)?
            .privileged;

            let entitled = diesel::sql_query(
                "SELECT id FROM properties WHERE entitled_user_ids ? $1::text",
            )
            .bind::<SqlUuid, _>(user_uuid)
            .load::<PropertyIdRow>(&mut connection)
            .map_err(EntitlementError::unavailable)?;

            Ok(Entitlements::new(
                user,
                privileged,
                entitled.into_iter().map(|row| PropertyId::from_uuid(row.id)),
            ))
        })
        .await
        .map_err(EntitlementError::unavailable)?
    }
}

fn to_write_row(task: &PmTask) -> PmRepositoryResult<PmTaskWriteRow> {
    let machine_ids =
        serde_json::to_value(task.machine_ids()).map_err(PmRepositoryError::unavailable)?;
    let custom_interval_days = task
        .custom_interval_days()
        .map(i32::try_from)
        .transpose()
        .map_err(PmRepositoryError::unavailable)?;

    Ok(PmTaskWriteRow {
        id: task.id().into_inner(),
        title: task.title().to_owned(),
        scheduled_date: task.scheduled_date(),
        completed_date: task.completed_date(),
        frequency: task.frequency().as_str().to_owned(),
        custom_interval_days,
        next_due_date: task.next_due_date(),
        state: task.state().as_str().to_owned(),
        machine_ids,
        job_id: task.job_id().map(JobId::into_inner),
        assigned_to: task.assigned_to().map(UserId::into_inner),
        created_by: task.created_by().into_inner(),
        priority: task.priority().as_str().to_owned(),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

fn row_to_task(row: PmTaskRow) -> PmRepositoryResult<PmTask> {
    let frequency =
        Frequency::try_from(row.frequency.as_str()).map_err(PmRepositoryError::unavailable)?;
    let state = TaskState::try_from(row.state.as_str()).map_err(PmRepositoryError::unavailable)?;
    let priority =
        Priority::try_from(row.priority.as_str()).map_err(PmRepositoryError::unavailable)?;
    let machine_ids: BTreeSet<MachineId> =
        serde_json::from_value(row.machine_ids).map_err(PmRepositoryError::unavailable)?;
    let custom_interval_days = row
        .custom_interval_days
        .map(u32::try_from)
        .transpose()
        .map_err(PmRepositoryError::unavailable)?;

    Ok(PmTask::from_persisted(PersistedPmTaskData {
        id: PmTaskId::from_uuid(row.id),
        title: row.title,
        scheduled_date: row.scheduled_date,
        completed_date: row.completed_date,
        frequency,
        custom_interval_days,
        next_due_date: row.next_due_date,
        state,
        machine_ids,
        job_id: row.job_id.map(JobId::from_uuid),
        assigned_to: row.assigned_to.map(UserId::from_uuid),
        created_by: UserId::from_uuid(row.created_by),
        priority,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}
