//! Diesel row models for PM scheduling persistence.

use super::schema::{machines, pm_tasks, rooms};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for PM task records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = pm_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PmTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Scheduled occurrence date.
    pub scheduled_date: NaiveDate,
    /// Completion date, if completed.
    pub completed_date: Option<NaiveDate>,
    /// Recurrence frequency name.
    pub frequency: String,
    /// Interval in days for custom frequencies.
    pub custom_interval_days: Option<i32>,
    /// Next due date, if written at completion.
    pub next_due_date: Option<NaiveDate>,
    /// Stored lifecycle state.
    pub state: String,
    /// Assigned machine identifiers as a JSON array of UUID strings.
    pub machine_ids: Value,
    /// Optional job reference.
    pub job_id: Option<uuid::Uuid>,
    /// Optional assignee.
    pub assigned_to: Option<uuid::Uuid>,
    /// Creating user.
    pub created_by: uuid::Uuid,
    /// Urgency classification.
    pub priority: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert/update model for PM task records.
///
/// `treat_none_as_null` keeps the changeset faithful to the aggregate:
/// a `None` field writes SQL NULL rather than skipping the column.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = pm_tasks)]
#[diesel(treat_none_as_null = true)]
pub struct PmTaskWriteRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Scheduled occurrence date.
    pub scheduled_date: NaiveDate,
    /// Completion date, if completed.
    pub completed_date: Option<NaiveDate>,
    /// Recurrence frequency name.
    pub frequency: String,
    /// Interval in days for custom frequencies.
    pub custom_interval_days: Option<i32>,
    /// Next due date, if written at completion.
    pub next_due_date: Option<NaiveDate>,
    /// Stored lifecycle state.
    pub state: String,
    /// Assigned machine identifiers as a JSON array of UUID strings.
    pub machine_ids: Value,
    /// Optional job reference.
    pub job_id: Option<uuid::Uuid>,
    /// Optional assignee.
    pub assigned_to: Option<uuid::Uuid>,
    /// Creating user.
    pub created_by: uuid::Uuid,
    /// Urgency classification.
    pub priority: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for machine records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = machines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MachineRow {
    /// Machine identifier.
    pub id: uuid::Uuid,
    /// Machine display name.
    pub name: String,
    /// Owning property.
    pub property_id: uuid::Uuid,
}

/// Query result row for room records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RoomRow {
    /// Room identifier.
    pub id: uuid::Uuid,
    /// Owning property.
    pub property_id: uuid::Uuid,
}
