//! CRUD and entitlement-lookup tests for the `PostgreSQL` PM store.

use crate::postgres::helpers::{
    StoreContext, build_task, date, seed_privileged, seed_property, store_context,
};
use rstest::rstest;
use upkeep::pm::domain::{JobId, MachineId, PmTaskId, Priority, PropertyId, TaskState, UserId};
use upkeep::pm::ports::{EntitlementProvider, PmRepositoryError, PmTaskRepository};

#[rstest]
fn store_and_find_round_trips_the_task(store_context: StoreContext) {
    let context = store_context;

    let machine = MachineId::new();
    let job = JobId::new();
    let assignee = UserId::new();
    let task =
        build_task(date(2026, 3, 20), [machine], Some(job), Some(assignee)).expect("valid task");

    context
        .rt
        .block_on(context.store.store(&task))
        .expect("store should succeed");
    let found = context
        .rt
        .block_on(context.store.find_by_id(task.id()))
        .expect("find_by_id should succeed")
        .expect("task should exist");

    assert_eq!(found.id(), task.id());
    assert_eq!(found.title(), task.title());
    assert_eq!(found.scheduled_date(), date(2026, 3, 20));
    assert_eq!(found.state(), TaskState::Open);
    assert_eq!(found.machine_ids(), task.machine_ids());
    assert_eq!(found.job_id(), Some(job));
    assert_eq!(found.assigned_to(), Some(assignee));
    assert_eq!(found.created_by(), task.created_by());
    assert_eq!(found.priority(), Priority::Medium);

    context.cleanup();
}

#[rstest]
fn find_by_id_returns_none_for_missing(store_context: StoreContext) {
    let context = store_context;

    let found = context
        .rt
        .block_on(context.store.find_by_id(PmTaskId::new()))
        .expect("query ok");
    assert!(found.is_none());

    context.cleanup();
}

#[rstest]
fn storing_the_same_id_twice_reports_a_duplicate(store_context: StoreContext) {
    let context = store_context;

    let task = build_task(date(2026, 3, 20), Vec::new(), None, None).expect("valid task");
    context
        .rt
        .block_on(context.store.store(&task))
        .expect("first store should succeed");

    let result = context.rt.block_on(context.store.store(&task));
    assert!(
        matches!(result, Err(PmRepositoryError::DuplicateTask(id)) if id == task.id()),
        "second store of the same id should report a duplicate"
    );

    context.cleanup();
}

#[rstest]
fn updating_a_missing_task_reports_not_found(store_context: StoreContext) {
    let context = store_context;

    let task = build_task(date(2026, 3, 20), Vec::new(), None, None).expect("valid task");
    let result = context.rt.block_on(context.store.update(&task));
    assert!(
        matches!(result, Err(PmRepositoryError::NotFound(id)) if id == task.id()),
        "update of an absent row should report not found"
    );

    context.cleanup();
}

#[rstest]
fn entitlements_resolve_from_property_and_privilege_rows(store_context: StoreContext) {
    let context = store_context;

    let property_a = PropertyId::new();
    let property_b = PropertyId::new();
    let alice = UserId::new();
    let admin = UserId::new();
    seed_property(context.cluster, &context.db_name, property_a, &[alice])
        .expect("seed property a");
    seed_property(context.cluster, &context.db_name, property_b, &[]).expect("seed property b");
    seed_privileged(context.cluster, &context.db_name, admin).expect("seed privilege");

    let resolved = context
        .rt
        .block_on(context.store.entitlements_for(alice))
        .expect("entitlement lookup");
    assert!(!resolved.is_privileged());
    let entitled: Vec<PropertyId> = resolved.property_ids().iter().copied().collect();
    assert_eq!(entitled, vec![property_a]);

    let elevated = context
        .rt
        .block_on(context.store.entitlements_for(admin))
        .expect("entitlement lookup");
    assert!(elevated.is_privileged());

    context.cleanup();
}

#[rstest]
fn unknown_users_resolve_to_empty_entitlements(store_context: StoreContext) {
    let context = store_context;

    let stranger = context
        .rt
        .block_on(context.store.entitlements_for(UserId::new()))
        .expect("entitlement lookup");
    assert!(!stranger.is_privileged());
    assert!(stranger.property_ids().is_empty());

    context.cleanup();
}
