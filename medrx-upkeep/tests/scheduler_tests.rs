//! End-to-end tests for the check/execute cycle.

mod common;

use chrono::Duration;
use common::{epoch, Fixture};
use medrx_types::{Domain, PrescriptionId, PrescriptionStatus, Principal, UserId};
use medrx_upkeep::{
    CursorSnapshot, CursorState, EntityRef, ExecutionPlan, FailureKind, MaintenanceConfig,
    MaintenanceError, MaintenanceEvent, MaintenanceScheduler, SchedulerPhase, MAX_PLAN_ENTRIES,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;

// ── construction ─────────────────────────────────────────────────

#[test]
fn seeds_indexes_from_stores() {
    let fx = Fixture::new();
    let users: Vec<UserId> = (0..3).map(|_| fx.user(10)).collect();
    let rx = fx.prescription(5);
    let dispensed = fx.prescription(5);
    fx.store.inner.mark_dispensed(&dispensed).unwrap();

    let scheduler = fx.scheduler();
    assert_eq!(scheduler.user_index().unwrap().as_slice(), users.as_slice());
    assert_eq!(scheduler.prescription_index().unwrap().as_slice(), &[rx]);
    assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
    assert_eq!(scheduler.executor().unwrap(), Some(fx.executor));
    assert_eq!(scheduler.administrator().unwrap(), fx.admin);
    assert!(scheduler.drain_events().is_empty());
}

#[test]
fn invalid_config_is_rejected() {
    let fx = Fixture::new();
    let result = MaintenanceScheduler::new(
        MaintenanceConfig::new(fx.admin).with_batch_sizes(0, 1),
        fx.store.clone(),
        fx.store.clone(),
        fx.clock.clone(),
    );
    assert!(matches!(result, Err(MaintenanceError::InvalidConfiguration(_))));

    let result = MaintenanceScheduler::new(
        MaintenanceConfig::new(fx.admin).with_batch_sizes(1, MAX_PLAN_ENTRIES + 1),
        fx.store.clone(),
        fx.store.clone(),
        fx.clock.clone(),
    );
    assert!(matches!(result, Err(MaintenanceError::InvalidConfiguration(_))));
}

// ── check ────────────────────────────────────────────────────────

#[test]
fn check_plans_only_stale_users() {
    let fx = Fixture::new();
    let stale_a = fx.user(400);
    let stale_b = fx.user(400);
    let _recent = fx.user(10);
    let scheduler = fx.scheduler();

    let outcome = scheduler.check_cycle().unwrap();
    assert!(outcome.needed);
    assert_eq!(outcome.plan.users(), &[stale_a, stale_b]);
    assert!(outcome.plan.prescriptions().is_empty());
}

#[test]
fn check_plans_only_expired_prescriptions() {
    let fx = Fixture::new();
    let expired = fx.prescription(-1);
    let _current = fx.prescription(3);
    let scheduler = fx.scheduler();

    let outcome = scheduler.check_cycle().unwrap();
    assert_eq!(outcome.plan.prescriptions(), &[expired]);
    assert!(outcome.plan.users().is_empty());
}

#[test]
fn check_with_nothing_stale_is_not_needed() {
    let fx = Fixture::new();
    fx.user(1);
    fx.prescription(10);
    let outcome = fx.scheduler().check_cycle().unwrap();
    assert!(!outcome.needed);
    assert!(outcome.plan.is_empty());
}

#[test]
fn check_on_empty_domains() {
    let fx = Fixture::new();
    let outcome = fx.scheduler().check_cycle().unwrap();
    assert!(!outcome.needed);
}

#[test]
fn check_is_repeatable() {
    let fx = Fixture::new();
    for age in [500, 20, 600, 700] {
        fx.user(age);
    }
    fx.prescription(-3);
    let scheduler = fx.scheduler();

    let first = scheduler.check_cycle().unwrap();
    let second = scheduler.check_cycle().unwrap();
    assert_eq!(first, second);
    assert_eq!(scheduler.cursor_state().unwrap(), CursorSnapshot::default());
}

#[test]
fn check_only_reads_cursor_window() {
    let fx = Fixture::new();
    let users: Vec<UserId> = (0..5).map(|_| fx.user(400)).collect();
    let scheduler = fx.scheduler_with(fx.config().with_batch_sizes(2, 2));

    let outcome = scheduler.check_cycle().unwrap();
    assert_eq!(outcome.plan.users(), &users[..2]);
}

#[test]
fn check_fails_on_dangling_index_entry() {
    let fx = Fixture::new();
    fx.user(400);
    let ghost = fx.user(400);
    let scheduler = fx.scheduler();
    fx.store.hide_user(ghost);

    match scheduler.check_cycle() {
        Err(MaintenanceError::IndexMismatch { domain, id }) => {
            assert_eq!(domain, Domain::Users);
            assert_eq!(id, ghost.to_string());
        }
        other => panic!("expected IndexMismatch, got {:?}", other),
    }
}

// ── execute ──────────────────────────────────────────────────────

#[test]
fn execute_deactivates_users_and_keeps_them_indexed() {
    let fx = Fixture::new();
    let stale_a = fx.user(400);
    let stale_b = fx.user(400);
    let recent = fx.user(10);
    let scheduler = fx.scheduler();

    let outcome = scheduler.check_cycle().unwrap();
    let report = scheduler.execute_cycle(fx.executor, &outcome.plan).unwrap();

    assert!(report.is_complete());
    assert_eq!(
        report.succeeded(),
        &[EntityRef::User(stale_a), EntityRef::User(stale_b)]
    );
    assert!(!fx.user_record(&stale_a).active);
    assert!(!fx.user_record(&stale_b).active);
    assert!(fx.user_record(&recent).active);

    // Deactivated users stay in the index.
    assert_eq!(scheduler.domain_count(Domain::Users).unwrap(), 3);
    // 20 % 3 == 2
    assert_eq!(report.user_cursor, CursorState { position: 2, batch_size: 20 });
    assert_eq!(scheduler.cursor_state().unwrap().users, report.user_cursor);
}

#[test]
fn execute_invalidates_expired_prescription_and_removes_it() {
    let fx = Fixture::new();
    let expired = fx.prescription(-2);
    let current = fx.prescription(2);
    let scheduler = fx.scheduler();
    assert_eq!(scheduler.domain_count(Domain::Prescriptions).unwrap(), 2);

    let outcome = scheduler.check_cycle().unwrap();
    let report = scheduler.execute_cycle(fx.executor, &outcome.plan).unwrap();

    assert!(report.is_success(&EntityRef::Prescription(expired)));
    assert_eq!(fx.prescription_record(&expired).status, PrescriptionStatus::Invalidated);
    assert_eq!(scheduler.domain_count(Domain::Prescriptions).unwrap(), 1);
    assert_eq!(scheduler.prescription_index().unwrap().as_slice(), &[current]);
    assert_eq!(report.prescription_cursor.position, 0);
}

#[test]
fn execute_empty_plan_is_rejected_without_side_effects() {
    let fx = Fixture::new();
    fx.user(400);
    let scheduler = fx.scheduler();

    let err = scheduler
        .execute_cycle(fx.executor, &ExecutionPlan::empty())
        .unwrap_err();
    assert!(matches!(err, MaintenanceError::EmptyPlan));
    assert_eq!(scheduler.cursor_state().unwrap(), CursorSnapshot::default());
    assert!(scheduler.drain_events().is_empty());
}

#[test]
fn execute_by_stranger_is_unauthorized() {
    let fx = Fixture::new();
    let stale = fx.user(400);
    let scheduler = fx.scheduler();
    let plan = scheduler.check_cycle().unwrap().plan;

    let stranger = Principal::new();
    match scheduler.execute_cycle(stranger, &plan) {
        Err(MaintenanceError::Unauthorized { caller, .. }) => assert_eq!(caller, stranger),
        other => panic!("expected Unauthorized, got {:?}", other),
    }
    assert!(fx.user_record(&stale).active);
    assert_eq!(scheduler.cursor_state().unwrap(), CursorSnapshot::default());
}

#[test]
fn execute_without_configured_executor_is_unauthorized() {
    let fx = Fixture::new();
    let stale = fx.user(400);
    let scheduler = fx.scheduler_with(MaintenanceConfig::new(fx.admin));
    let plan = scheduler.check_cycle().unwrap().plan;

    assert!(matches!(
        scheduler.execute_cycle(fx.admin, &plan),
        Err(MaintenanceError::Unauthorized { .. })
    ));
    assert!(fx.user_record(&stale).active);
}

#[test]
fn authorization_is_checked_before_empty_plan() {
    let fx = Fixture::new();
    let scheduler = fx.scheduler();
    assert!(matches!(
        scheduler.execute_cycle(Principal::new(), &ExecutionPlan::empty()),
        Err(MaintenanceError::Unauthorized { .. })
    ));
}

#[test]
fn user_no_longer_eligible_is_reported_and_rest_proceeds() {
    let fx = Fixture::new();
    let changed = fx.user(400);
    let stale = fx.user(400);
    let scheduler = fx.scheduler();
    let plan = scheduler.check_cycle().unwrap().plan;

    // The user links a record between check and execute.
    fx.store.inner.add_associated_record(&changed).unwrap();

    let report = scheduler.execute_cycle(fx.executor, &plan).unwrap();
    assert_eq!(report.success_count(), 1);
    assert!(report.is_success(&EntityRef::User(stale)));
    let failure = report.failure_for(&EntityRef::User(changed)).unwrap();
    assert_eq!(failure.kind, FailureKind::NotEligible);
    assert!(fx.user_record(&changed).active);

    // Cursors advance even on partial failure.
    assert_eq!(report.user_cursor.position, 0);
    assert!(matches!(
        report.into_result(),
        Err(MaintenanceError::PartialApplyFailure { failed: 1 })
    ));
}

#[test]
fn store_failure_is_reported_per_identifier() {
    let fx = Fixture::new();
    let broken = fx.user(400);
    let fine = fx.user(400);
    let expired = fx.prescription(-1);
    fx.store.fail_deactivate(broken);
    let scheduler = fx.scheduler();

    let plan = scheduler.check_cycle().unwrap().plan;
    let report = scheduler.execute_cycle(fx.executor, &plan).unwrap();

    assert_eq!(
        report.failure_for(&EntityRef::User(broken)).unwrap().kind,
        FailureKind::Store
    );
    assert!(report.is_success(&EntityRef::User(fine)));
    assert!(report.is_success(&EntityRef::Prescription(expired)));
    assert_eq!(scheduler.domain_count(Domain::Prescriptions).unwrap(), 0);
}

#[test]
fn prescription_already_dispensed_is_not_eligible() {
    let fx = Fixture::new();
    let rx = fx.prescription(-1);
    let scheduler = fx.scheduler();
    let plan = scheduler.check_cycle().unwrap().plan;

    fx.store.inner.mark_dispensed(&rx).unwrap();

    let report = scheduler.execute_cycle(fx.executor, &plan).unwrap();
    assert_eq!(
        report.failure_for(&EntityRef::Prescription(rx)).unwrap().kind,
        FailureKind::NotEligible
    );
    assert_eq!(fx.prescription_record(&rx).status, PrescriptionStatus::Dispensed);
    // Still indexed: only successful invalidations leave the index.
    assert_eq!(scheduler.domain_count(Domain::Prescriptions).unwrap(), 1);
}

#[test]
fn unknown_identifier_in_plan_is_reported_not_found() {
    let fx = Fixture::new();
    fx.user(10);
    let scheduler = fx.scheduler();
    let stray = UserId::new();

    let report = scheduler
        .execute_cycle(fx.executor, &ExecutionPlan::new(vec![stray], vec![]))
        .unwrap();
    assert_eq!(
        report.failure_for(&EntityRef::User(stray)).unwrap().kind,
        FailureKind::NotFound
    );
}

#[test]
fn execute_time_clock_is_authoritative() {
    let fx = Fixture::new();
    let rx = fx.prescription(-1);
    let scheduler = fx.scheduler();
    let plan = scheduler.check_cycle().unwrap().plan;

    fx.clock.set(epoch() - Duration::days(2));

    let report = scheduler.execute_cycle(fx.executor, &plan).unwrap();
    assert_eq!(
        report.failure_for(&EntityRef::Prescription(rx)).unwrap().kind,
        FailureKind::NotEligible
    );
}

#[test]
fn invalidating_unindexed_prescription_aborts_before_any_mutation() {
    let fx = Fixture::new();
    fx.prescription(5);
    let scheduler = fx.scheduler();
    // Issued after seeding and never tracked.
    let untracked = fx.prescription(-1);

    let err = scheduler
        .execute_cycle(fx.executor, &ExecutionPlan::new(vec![], vec![untracked]))
        .unwrap_err();
    assert!(matches!(
        err,
        MaintenanceError::NotFound { domain: Domain::Prescriptions, .. }
    ));
    assert!(err.is_invariant_violation());
    assert_eq!(
        fx.store.inner.prescription(&untracked).unwrap().unwrap().status,
        PrescriptionStatus::Valid
    );
    assert_eq!(scheduler.cursor_state().unwrap(), CursorSnapshot::default());
    assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
    assert!(scheduler.drain_events().is_empty());
}

#[test]
fn unindexed_prescription_leaves_planned_users_untouched() {
    let fx = Fixture::new();
    let user = fx.user(400);
    let scheduler = fx.scheduler();
    let untracked = fx.prescription(-1);

    let plan = ExecutionPlan::new(vec![user], vec![untracked]);
    let err = scheduler.execute_cycle(fx.executor, &plan).unwrap_err();
    assert!(err.is_invariant_violation());

    assert!(fx.store.inner.user(&user).unwrap().unwrap().active);
    assert_eq!(
        fx.store.inner.prescription(&untracked).unwrap().unwrap().status,
        PrescriptionStatus::Valid
    );
    assert!(scheduler.drain_events().is_empty());

    // Once tracked, the same plan goes through.
    scheduler.track_prescription(untracked).unwrap();
    let report = scheduler.execute_cycle(fx.executor, &plan).unwrap();
    assert_eq!(report.success_count(), 2);
    assert!(!fx.store.inner.user(&user).unwrap().unwrap().active);
}

#[test]
fn unindexed_prescription_that_is_not_stale_is_a_plain_failure() {
    let fx = Fixture::new();
    let user = fx.user(400);
    let scheduler = fx.scheduler();
    let untracked = fx.prescription(5);

    let report = scheduler
        .execute_cycle(fx.executor, &ExecutionPlan::new(vec![user], vec![untracked]))
        .unwrap();
    assert!(report.is_success(&EntityRef::User(user)));
    assert_eq!(
        report.failure_for(&EntityRef::Prescription(untracked)).unwrap().kind,
        FailureKind::NotEligible
    );
}

// ── multi-cycle sweeps ───────────────────────────────────────────

#[test]
fn user_sweep_walks_windows_and_wraps() {
    let fx = Fixture::new();
    let users: Vec<UserId> = (0..5).map(|_| fx.user(400)).collect();
    let scheduler = fx.scheduler_with(fx.config().with_batch_sizes(2, 2));

    let mut planned = Vec::new();
    for expected_next in [2, 4, 1] {
        let outcome = scheduler.check_cycle().unwrap();
        planned.extend_from_slice(outcome.plan.users());
        let report = scheduler.execute_cycle(fx.executor, &outcome.plan).unwrap();
        assert_eq!(report.user_cursor.position, expected_next);
    }

    assert_eq!(planned, users);
    assert!(users.iter().all(|id| !fx.user_record(id).active));
    assert!(!scheduler.check_cycle().unwrap().needed);
}

#[test]
fn prescription_sweep_reaches_swapped_entries() {
    let fx = Fixture::new();
    let rxs: Vec<PrescriptionId> = (0..4).map(|_| fx.prescription(-1)).collect();
    let scheduler = fx.scheduler_with(fx.config().with_batch_sizes(2, 2));

    let first = scheduler.check_cycle().unwrap();
    assert_eq!(first.plan.prescriptions(), &rxs[..2]);
    scheduler.execute_cycle(fx.executor, &first.plan).unwrap();

    // Removals pulled the tail forward; the cursor wrapped back to slot 0.
    assert_eq!(scheduler.prescription_index().unwrap().as_slice(), &[rxs[3], rxs[2]]);
    assert_eq!(scheduler.cursor_state().unwrap().prescriptions.position, 0);

    let second = scheduler.check_cycle().unwrap();
    assert_eq!(second.plan.prescriptions(), &[rxs[3], rxs[2]]);
    scheduler.execute_cycle(fx.executor, &second.plan).unwrap();

    assert_eq!(scheduler.domain_count(Domain::Prescriptions).unwrap(), 0);
    let invalidated: HashSet<_> = rxs
        .iter()
        .filter(|id| fx.prescription_record(id).status == PrescriptionStatus::Invalidated)
        .collect();
    assert_eq!(invalidated.len(), 4);
    assert!(!scheduler.check_cycle().unwrap().needed);
}

// ── encoded plans ────────────────────────────────────────────────

#[test]
fn encoded_plan_executes() {
    let fx = Fixture::new();
    let stale = fx.user(400);
    let expired = fx.prescription(-1);
    let scheduler = fx.scheduler();

    let bytes = scheduler.check_cycle().unwrap().encode();
    let report = scheduler.execute_encoded(fx.executor, &bytes).unwrap();
    assert!(report.is_success(&EntityRef::User(stale)));
    assert!(report.is_success(&EntityRef::Prescription(expired)));
}

#[test]
fn encoded_plan_authorizes_before_decoding() {
    let fx = Fixture::new();
    let scheduler = fx.scheduler();
    let garbage = [1u8, 2, 3];

    assert!(matches!(
        scheduler.execute_encoded(Principal::new(), &garbage),
        Err(MaintenanceError::Unauthorized { .. })
    ));
    assert!(matches!(
        scheduler.execute_encoded(fx.executor, &garbage),
        Err(MaintenanceError::PlanDecode(_))
    ));
}

// ── events ───────────────────────────────────────────────────────

#[test]
fn execute_emits_one_event_per_mutation_and_a_completion() {
    let fx = Fixture::new();
    let stale = fx.user(400);
    let expired = fx.prescription(-1);
    let scheduler = fx.scheduler();

    let plan = scheduler.check_cycle().unwrap().plan;
    let report = scheduler.execute_cycle(fx.executor, &plan).unwrap();

    assert_eq!(
        scheduler.drain_events(),
        vec![
            MaintenanceEvent::UserDeactivated { user: stale },
            MaintenanceEvent::PrescriptionInvalidated { prescription: expired },
            MaintenanceEvent::CycleCompleted {
                succeeded: 2,
                failed: 0,
                user_cursor: report.user_cursor,
                prescription_cursor: report.prescription_cursor,
            },
        ]
    );
    assert!(scheduler.drain_events().is_empty());
}

#[test]
fn events_serialize_with_tag() {
    let event = MaintenanceEvent::BatchSizeChanged {
        domain: Domain::Users,
        batch_size: 7,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "batch_size_changed");
    assert_eq!(json["batch_size"], 7);
}

// ── administration ───────────────────────────────────────────────

#[test]
fn executor_can_be_designated_later() {
    let fx = Fixture::new();
    fx.user(400);
    let scheduler = fx.scheduler_with(MaintenanceConfig::new(fx.admin));

    assert!(scheduler.set_executor(fx.admin, fx.executor).unwrap());
    assert!(!scheduler.set_executor(fx.admin, fx.executor).unwrap());
    assert!(scheduler.set_executor(Principal::new(), Principal::new()).is_err());

    let plan = scheduler.check_cycle().unwrap().plan;
    assert!(scheduler.execute_cycle(fx.executor, &plan).is_ok());

    let events = scheduler.drain_events();
    assert_eq!(
        events[0],
        MaintenanceEvent::ExecutorChanged {
            previous: None,
            current: fx.executor
        }
    );
}

#[test]
fn administration_can_be_transferred() {
    let fx = Fixture::new();
    let scheduler = fx.scheduler();
    let successor = Principal::new();

    assert!(scheduler.transfer_administration(fx.admin, successor).unwrap());
    assert_eq!(scheduler.administrator().unwrap(), successor);
    assert!(scheduler.set_batch_size(fx.admin, Domain::Users, 3).is_err());
    assert!(scheduler.set_batch_size(successor, Domain::Users, 3).is_ok());
    assert_eq!(
        scheduler.drain_events()[0],
        MaintenanceEvent::AdministrationTransferred {
            previous: fx.admin,
            current: successor
        }
    );
}

#[test]
fn batch_size_change_affects_next_window() {
    let fx = Fixture::new();
    let users: Vec<UserId> = (0..4).map(|_| fx.user(400)).collect();
    let scheduler = fx.scheduler();

    assert!(matches!(
        scheduler.set_batch_size(fx.admin, Domain::Users, 0),
        Err(MaintenanceError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        scheduler.set_batch_size(fx.admin, Domain::Prescriptions, MAX_PLAN_ENTRIES + 1),
        Err(MaintenanceError::InvalidConfiguration(_))
    ));
    assert_eq!(scheduler.cursor_state().unwrap().prescriptions.batch_size, 20);
    assert!(matches!(
        scheduler.set_batch_size(fx.executor, Domain::Users, 1),
        Err(MaintenanceError::Unauthorized { .. })
    ));

    scheduler.set_batch_size(fx.admin, Domain::Users, 1).unwrap();
    assert_eq!(scheduler.check_cycle().unwrap().plan.users(), &users[..1]);
    assert_eq!(scheduler.cursor_state().unwrap().users.batch_size, 1);
}

#[test]
fn inactivity_period_change_is_authoritative() {
    let fx = Fixture::new();
    let young = fx.user(10);
    let scheduler = fx.scheduler();
    assert!(!scheduler.check_cycle().unwrap().needed);

    scheduler
        .set_inactivity_period(fx.admin, Duration::days(5))
        .unwrap();
    assert_eq!(scheduler.inactivity_period().unwrap(), Duration::days(5));
    assert_eq!(scheduler.check_cycle().unwrap().plan.users(), &[young]);

    assert!(scheduler.set_inactivity_period(fx.admin, Duration::zero()).is_err());
    assert!(
        scheduler
            .set_inactivity_period(fx.executor, Duration::days(1))
            .is_err()
    );
    assert!(scheduler.drain_events().contains(&MaintenanceEvent::InactivityPeriodChanged {
        seconds: Duration::days(5).num_seconds()
    }));
}

// ── index tracking ───────────────────────────────────────────────

#[test]
fn tracking_new_entities() {
    let fx = Fixture::new();
    let scheduler = fx.scheduler();

    let user = fx.user(400);
    let rx = fx.prescription(-1);
    scheduler.track_user(user).unwrap();
    scheduler.track_prescription(rx).unwrap();

    assert_eq!(scheduler.domain_count(Domain::Users).unwrap(), 1);
    assert_eq!(scheduler.domain_count(Domain::Prescriptions).unwrap(), 1);
    assert!(matches!(
        scheduler.track_user(user),
        Err(MaintenanceError::DuplicateIdentifier { domain: Domain::Users, .. })
    ));

    let plan = scheduler.check_cycle().unwrap().plan;
    assert_eq!(plan.users(), &[user]);
    assert_eq!(plan.prescriptions(), &[rx]);
}

#[test]
fn tracking_unknown_or_settled_entities_fails() {
    let fx = Fixture::new();
    let scheduler = fx.scheduler();

    assert!(matches!(
        scheduler.track_user(UserId::new()),
        Err(MaintenanceError::NotFound { domain: Domain::Users, .. })
    ));

    let dispensed = fx.prescription(5);
    fx.store.inner.mark_dispensed(&dispensed).unwrap();
    assert!(matches!(
        scheduler.track_prescription(dispensed),
        Err(MaintenanceError::NotFound { domain: Domain::Prescriptions, .. })
    ));
}

#[test]
fn rebuild_picks_up_store_changes() {
    let fx = Fixture::new();
    let rx = fx.prescription(5);
    let scheduler = fx.scheduler();

    let user = fx.user(20);
    fx.store.inner.mark_dispensed(&rx).unwrap();

    assert!(matches!(
        scheduler.rebuild_indexes(fx.executor),
        Err(MaintenanceError::Unauthorized { .. })
    ));
    scheduler.rebuild_indexes(fx.admin).unwrap();
    assert_eq!(scheduler.user_index().unwrap().as_slice(), &[user]);
    assert!(scheduler.prescription_index().unwrap().is_empty());
}

#[test]
fn refresh_appends_new_records_and_drops_settled_prescriptions() {
    let fx = Fixture::new();
    let first = fx.user(400);
    let kept = fx.prescription(5);
    let settled = fx.prescription(5);
    let scheduler = fx.scheduler();
    assert_eq!(scheduler.refresh_indexes().unwrap(), 0);

    let late_user = fx.user(400);
    let late_rx = fx.prescription(-1);
    fx.store.inner.mark_dispensed(&settled).unwrap();

    assert_eq!(scheduler.refresh_indexes().unwrap(), 3);
    assert_eq!(scheduler.user_index().unwrap().as_slice(), &[first, late_user]);
    let prescriptions: HashSet<PrescriptionId> =
        scheduler.prescription_index().unwrap().iter().copied().collect();
    assert_eq!(prescriptions, HashSet::from([kept, late_rx]));

    let plan = scheduler.check_cycle().unwrap().plan;
    assert_eq!(plan.users(), &[first, late_user]);
    assert_eq!(plan.prescriptions(), &[late_rx]);

    // Nothing left to reconcile.
    assert_eq!(scheduler.refresh_indexes().unwrap(), 0);
}

#[test]
fn refresh_clamps_cursor_when_prescriptions_settle() {
    let fx = Fixture::new();
    let rx: Vec<PrescriptionId> = (0..4).map(|_| fx.prescription(5)).collect();
    let scheduler = fx.scheduler_with(fx.config().with_batch_sizes(3, 3));
    scheduler
        .restore_cursors(CursorSnapshot {
            users: CursorState::default(),
            prescriptions: CursorState { position: 3, batch_size: 3 },
        })
        .unwrap();

    for id in &rx[1..] {
        fx.store.inner.mark_dispensed(id).unwrap();
    }
    assert_eq!(scheduler.refresh_indexes().unwrap(), 3);
    assert_eq!(scheduler.prescription_index().unwrap().as_slice(), &[rx[0]]);
    assert_eq!(scheduler.cursor_state().unwrap().prescriptions.position, 0);
}

// ── cursor persistence ───────────────────────────────────────────

#[test]
fn restore_cursors_keeps_batch_sizes() {
    let fx = Fixture::new();
    for _ in 0..6 {
        fx.user(10);
    }
    let scheduler = fx.scheduler_with(fx.config().with_batch_sizes(3, 4));

    scheduler
        .restore_cursors(CursorSnapshot {
            users: CursorState { position: 8, batch_size: 99 },
            prescriptions: CursorState { position: 2, batch_size: 99 },
        })
        .unwrap();

    let state = scheduler.cursor_state().unwrap();
    assert_eq!(state.users, CursorState { position: 2, batch_size: 3 });
    // No prescriptions: position collapses to zero.
    assert_eq!(state.prescriptions, CursorState { position: 0, batch_size: 4 });
}

#[test]
fn scheduler_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MaintenanceScheduler>();
    let _shared: Arc<MaintenanceScheduler> = Arc::new(Fixture::new().scheduler());
}
