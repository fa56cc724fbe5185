//! Diesel schema for PM scheduling persistence.

diesel::table! {
    /// PM task records.
    pm_tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Task title.
        title -> Text,
        /// Scheduled occurrence date.
        scheduled_date -> Date,
        /// Completion date, set when the task completes.
        completed_date -> Nullable<Date>,
        /// Recurrence frequency name.
        #[max_length = 50]
        frequency -> Varchar,
        /// Interval in days for custom frequencies.
        custom_interval_days -> Nullable<Int4>,
        /// Next due date, written once at completion.
        next_due_date -> Nullable<Date>,
        /// Stored lifecycle state.
        #[max_length = 50]
        state -> Varchar,
        /// Assigned machine identifiers as a JSON array of UUID strings.
        machine_ids -> Jsonb,
        /// Optional job reference.
        job_id -> Nullable<Uuid>,
        /// Optional assignee.
        assigned_to -> Nullable<Uuid>,
        /// Creating user.
        created_by -> Uuid,
        /// Urgency classification.
        #[max_length = 50]
        priority -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Machine records, each owned by exactly one property.
    machines (id) {
        /// Machine identifier.
        id -> Uuid,
        /// Machine display name.
        name -> Text,
        /// Owning property.
        property_id -> Uuid,
    }
}

diesel::table! {
    /// Room records, each owned by exactly one property.
    rooms (id) {
        /// Room identifier.
        id -> Uuid,
        /// Owning property.
        property_id -> Uuid,
    }
}

diesel::table! {
    /// Job records grouping the rooms a task applies to.
    jobs (id) {
        /// Job identifier.
        id -> Uuid,
        /// Covered room identifiers as a JSON array of UUID strings.
        room_ids -> Jsonb,
    }
}

diesel::table! {
    /// Property records with their entitled users.
    properties (id) {
        /// Property identifier.
        id -> Uuid,
        /// Property display name.
        name -> Text,
        /// Entitled user identifiers as a JSON array of UUID strings.
        entitled_user_ids -> Jsonb,
    }
}

diesel::table! {
    /// Users who bypass the visibility filter entirely.
    privileged_users (user_id) {
        /// Privileged user identifier.
        user_id -> Uuid,
    }
}
