//! Shared helpers for `PostgreSQL` PM store tests.

pub use super::cluster::{BoxError, PostgresCluster, postgres_cluster};
use super::cluster::ManagedCluster;
use chrono::NaiveDate;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use rstest::fixture;
use std::collections::BTreeSet;
use tokio::runtime::Runtime;
use upkeep::pm::adapters::postgres::PostgresPmStore;
use upkeep::pm::domain::{
    Frequency, JobId, MachineId, NewPmTask, PmTask, PmTaskId, Priority, PropertyId, RoomId,
    UserId,
};
use uuid::Uuid;

/// SQL creating the PM schema for tests.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-08-01-000000_create_pm_tables/up.sql");

/// Template database name with the schema pre-applied.
pub const TEMPLATE_DB: &str = "upkeep_test_template";

/// Builds the runtime driving async store calls from synchronous tests.
///
/// # Errors
///
/// Returns an error if runtime construction fails.
pub fn test_runtime() -> Result<Runtime, BoxError> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|err| Box::new(err) as BoxError)
}

/// Ensures the template database exists with the schema applied.
///
/// # Errors
///
/// Returns an error if template creation or migration fails.
pub fn ensure_template(cluster: &ManagedCluster) -> Result<(), BoxError> {
    cluster.ensure_template_exists(TEMPLATE_DB, |db_name| {
        apply_migrations(&cluster.database_url(db_name))
    })
}

fn apply_migrations(url: &str) -> Result<(), BoxError> {
    let mut conn = PgConnection::establish(url).map_err(|err| Box::new(err) as BoxError)?;
    conn.batch_execute(CREATE_SCHEMA_SQL)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

/// Drops the per-test database once the test is done with it.
pub struct CleanupGuard<'cluster> {
    cluster: &'cluster ManagedCluster,
    db_name: String,
}

impl<'cluster> CleanupGuard<'cluster> {
    /// Registers a database for cleanup.
    #[must_use]
    pub const fn new(cluster: &'cluster ManagedCluster, db_name: String) -> Self {
        Self { cluster, db_name }
    }

    /// Drops the registered database.
    ///
    /// # Errors
    ///
    /// Returns an error if the drop statement fails.
    pub fn cleanup(self) -> Result<(), BoxError> {
        self.cluster.drop_database(&self.db_name)
    }
}

/// Creates a per-test database from the template and opens a store on it.
///
/// # Errors
///
/// Returns an error if database creation or pool construction fails.
pub fn setup_store(cluster: &ManagedCluster, db_name: &str) -> Result<PostgresPmStore, BoxError> {
    cluster.create_database_from_template(db_name, TEMPLATE_DB)?;
    let manager = ConnectionManager::<PgConnection>::new(cluster.database_url(db_name));
    // Racing completion tests need two live connections at once.
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(PostgresPmStore::new(pool))
}

/// Per-test store context: a fresh database cloned from the template.
pub struct StoreContext {
    /// Shared cluster handle.
    pub cluster: PostgresCluster,
    /// Name of the per-test database.
    pub db_name: String,
    /// Cleanup guard for the per-test database.
    pub guard: CleanupGuard<'static>,
    /// Store under test.
    pub store: PostgresPmStore,
    /// Runtime driving async store calls.
    pub rt: Runtime,
}

impl StoreContext {
    /// Drops the store pool and its backing database.
    ///
    /// # Panics
    ///
    /// Panics if dropping the database fails.
    pub fn cleanup(self) {
        drop(self.store);
        self.guard.cleanup().expect("cleanup database");
    }
}

/// Provides a per-test store on a fresh database cloned from the template.
///
/// # Panics
///
/// Panics if cluster bootstrap, template setup, or store setup fails.
#[fixture]
pub fn store_context(postgres_cluster: PostgresCluster) -> StoreContext {
    let cluster = postgres_cluster;
    ensure_template(cluster).expect("template setup");
    let db_name = format!("upkeep_test_{}", Uuid::new_v4().simple());
    let guard = CleanupGuard::new(cluster, db_name.clone());
    let store = setup_store(cluster, &db_name).expect("store setup");
    let rt = test_runtime().expect("tokio runtime");
    StoreContext {
        cluster,
        db_name,
        guard,
        store,
        rt,
    }
}

/// Builds a `NaiveDate` from calendar components.
///
/// # Panics
///
/// Panics on an invalid calendar date.
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

/// Builds an open monthly task for seeding.
///
/// # Errors
///
/// Returns an error if task validation fails.
pub fn build_task(
    scheduled_date: NaiveDate,
    machine_ids: impl IntoIterator<Item = MachineId>,
    job_id: Option<JobId>,
    assigned_to: Option<UserId>,
) -> Result<PmTask, BoxError> {
    PmTask::new(
        NewPmTask {
            title: "Inspect machinery".to_owned(),
            scheduled_date,
            frequency: Frequency::Monthly,
            custom_interval_days: None,
            machine_ids: machine_ids.into_iter().collect::<BTreeSet<_>>(),
            job_id,
            assigned_to,
            created_by: UserId::new(),
            priority: Priority::Medium,
        },
        &DefaultClock,
    )
    .map_err(|err| Box::new(err) as BoxError)
}

fn connect(cluster: &ManagedCluster, db_name: &str) -> Result<PgConnection, BoxError> {
    PgConnection::establish(&cluster.database_url(db_name))
        .map_err(|err| Box::new(err) as BoxError)
}

/// Inserts a property row with its entitled users.
///
/// # Errors
///
/// Returns an error if connection or insert fails.
pub fn seed_property(
    cluster: &ManagedCluster,
    db_name: &str,
    property_id: PropertyId,
    entitled: &[UserId],
) -> Result<(), BoxError> {
    let users = serde_json::to_value(entitled).map_err(|err| Box::new(err) as BoxError)?;
    let mut conn = connect(cluster, db_name)?;
    diesel::sql_query(
        "INSERT INTO properties (id, name, entitled_user_ids) VALUES ($1, 'Test property', $2)",
    )
    .bind::<diesel::sql_types::Uuid, _>(property_id.into_inner())
    .bind::<diesel::sql_types::Jsonb, _>(users)
    .execute(&mut conn)
    .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

/// Inserts a privileged-user row.
///
/// # Errors
///
/// Returns an error if connection or insert fails.
pub fn seed_privileged(
    cluster: &ManagedCluster,
    db_name: &str,
    user: UserId,
) -> Result<(), BoxError> {
    let mut conn = connect(cluster, db_name)?;
    diesel::sql_query("INSERT INTO privileged_users (user_id) VALUES ($1)")
        .bind::<diesel::sql_types::Uuid, _>(user.into_inner())
        .execute(&mut conn)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

/// Inserts a machine row owned by the given property.
///
/// # Errors
///
/// Returns an error if connection or insert fails.
pub fn seed_machine(
    cluster: &ManagedCluster,
    db_name: &str,
    machine_id: MachineId,
    property_id: PropertyId,
) -> Result<(), BoxError> {
    let mut conn = connect(cluster, db_name)?;
    diesel::sql_query("INSERT INTO machines (id, name, property_id) VALUES ($1, 'Test machine', $2)")
        .bind::<diesel::sql_types::Uuid, _>(machine_id.into_inner())
        .bind::<diesel::sql_types::Uuid, _>(property_id.into_inner())
        .execute(&mut conn)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

/// Inserts a room row owned by the given property.
///
/// # Errors
///
/// Returns an error if connection or insert fails.
pub fn seed_room(
    cluster: &ManagedCluster,
    db_name: &str,
    room_id: RoomId,
    property_id: PropertyId,
) -> Result<(), BoxError> {
    let mut conn = connect(cluster, db_name)?;
    diesel::sql_query("INSERT INTO rooms (id, property_id) VALUES ($1, $2)")
        .bind::<diesel::sql_types::Uuid, _>(room_id.into_inner())
        .bind::<diesel::sql_types::Uuid, _>(property_id.into_inner())
        .execute(&mut conn)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

/// Inserts a job row covering the given rooms.
///
/// # Errors
///
/// Returns an error if connection or insert fails.
pub fn seed_job(
    cluster: &ManagedCluster,
    db_name: &str,
    job_id: JobId,
    rooms: &[RoomId],
) -> Result<(), BoxError> {
    let room_ids = serde_json::to_value(rooms).map_err(|err| Box::new(err) as BoxError)?;
    let mut conn = connect(cluster, db_name)?;
    diesel::sql_query("INSERT INTO jobs (id, room_ids) VALUES ($1, $2)")
        .bind::<diesel::sql_types::Uuid, _>(job_id.into_inner())
        .bind::<diesel::sql_types::Jsonb, _>(room_ids)
        .execute(&mut conn)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

#[derive(diesel::QueryableByName)]
struct StateRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    state: String,
}

/// Reads the stored lifecycle state of a task straight from the table.
///
/// # Errors
///
/// Returns an error if connection or query fails.
pub fn stored_state(
    cluster: &ManagedCluster,
    db_name: &str,
    task_id: PmTaskId,
) -> Result<String, BoxError> {
    let mut conn = connect(cluster, db_name)?;
    let row = diesel::sql_query("SELECT state FROM pm_tasks WHERE id = $1")
        .bind::<diesel::sql_types::Uuid, _>(task_id.into_inner())
        .get_result::<StateRow>(&mut conn)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(row.state)
}
