//! Two-phase maintenance scheduler.
//!
//! `check_cycle` is read-only: it walks one cursor window per domain and
//! collects the identifiers whose staleness rule holds. `execute_cycle`
//! applies such a plan through the stores, drops invalidated prescriptions
//! from their active index, and advances every cursor exactly once.
//!
//! Only one execute may be in flight; a second one fails fast with
//! `CycleInProgress`. Checks may run at any time and see whatever state
//! exists when they take the read lock.

use crate::clock::Clock;
use crate::config::MaintenanceConfig;
use crate::cursor::{BatchCursor, CursorState};
use crate::error::{MaintenanceError, MaintenanceResult};
use crate::event::MaintenanceEvent;
use crate::gate::ExecutionGate;
use crate::plan::{CheckOutcome, ExecutionPlan};
use crate::registry::{ActiveIndexRegistry, RegistrySnapshot};
use crate::report::{CycleReport, EntityRef, FailureKind};
use crate::scanner::{scan, PrescriptionExpiry, StalenessRule, UserInactivity};
use chrono::{DateTime, Duration, Utc};
use medrx_store::{PrescriptionStore, StoreResult, UserStore};
use medrx_types::{Domain, PrescriptionId, PrescriptionStatus, Principal, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

/// Whether an execute phase is currently applying a plan.
///
/// A computed-but-unapplied plan is not tracked: plans live with the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// No execute in flight.
    Idle,
    /// An execute is applying a plan.
    Executing,
}

/// Cursor positions for every domain, for persistence between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    /// User cursor.
    pub users: CursorState,
    /// Prescription cursor.
    pub prescriptions: CursorState,
}

#[derive(Debug)]
struct DomainIndex<Id> {
    registry: ActiveIndexRegistry<Id>,
    cursor: BatchCursor,
}

impl<Id> DomainIndex<Id>
where
    Id: Copy + Eq + Hash + fmt::Display,
{
    fn seed(domain: Domain, ids: Vec<Id>, batch_size: usize) -> MaintenanceResult<Self> {
        let registry = ActiveIndexRegistry::from_ids(ids).map_err(|e| e.in_domain(domain))?;
        Ok(Self {
            registry,
            cursor: BatchCursor::new(batch_size)?,
        })
    }

    fn plan<R: StalenessRule>(
        &self,
        domain: Domain,
        rule: &R,
        now: DateTime<Utc>,
        lookup: impl Fn(&Id) -> StoreResult<Option<R::Record>>,
    ) -> MaintenanceResult<Vec<Id>> {
        let window = self.cursor.window(self.registry.count());
        debug!(
            "Scanning {} slots [{}, {}) of {}",
            domain,
            window.start,
            window.end,
            self.registry.count()
        );
        scan(self.registry.as_slice(), window, |id| -> MaintenanceResult<bool> {
            let record = lookup(id)?.ok_or_else(|| MaintenanceError::IndexMismatch {
                domain,
                id: id.to_string(),
            })?;
            Ok(rule.is_stale(&record, now))
        })
        .collect()
    }
}

struct SchedulerState {
    users: DomainIndex<UserId>,
    prescriptions: DomainIndex<PrescriptionId>,
    gate: ExecutionGate,
    user_rule: UserInactivity,
}

/// Per-domain hooks shared by the check and execute paths.
trait DomainKey: Copy + Eq + Hash + fmt::Display {
    const DOMAIN: Domain;

    fn index(state: &SchedulerState) -> &DomainIndex<Self>;
    fn index_mut(state: &mut SchedulerState) -> &mut DomainIndex<Self>;
    fn entity_ref(self) -> EntityRef;
    fn applied_event(self) -> MaintenanceEvent;
}

impl DomainKey for UserId {
    const DOMAIN: Domain = Domain::Users;

    fn index(state: &SchedulerState) -> &DomainIndex<Self> {
        &state.users
    }

    fn index_mut(state: &mut SchedulerState) -> &mut DomainIndex<Self> {
        &mut state.users
    }

    fn entity_ref(self) -> EntityRef {
        EntityRef::User(self)
    }

    fn applied_event(self) -> MaintenanceEvent {
        MaintenanceEvent::UserDeactivated { user: self }
    }
}

impl DomainKey for PrescriptionId {
    const DOMAIN: Domain = Domain::Prescriptions;

    fn index(state: &SchedulerState) -> &DomainIndex<Self> {
        &state.prescriptions
    }

    fn index_mut(state: &mut SchedulerState) -> &mut DomainIndex<Self> {
        &mut state.prescriptions
    }

    fn entity_ref(self) -> EntityRef {
        EntityRef::Prescription(self)
    }

    fn applied_event(self) -> MaintenanceEvent {
        MaintenanceEvent::PrescriptionInvalidated { prescription: self }
    }
}

/// Holds the executing flag for the lifetime of one execute.
struct ExecutionGuard<'a>(&'a AtomicBool);

impl<'a> ExecutionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> MaintenanceResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MaintenanceError::CycleInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates staleness maintenance across the user and prescription domains.
pub struct MaintenanceScheduler {
    user_store: Arc<dyn UserStore>,
    prescription_store: Arc<dyn PrescriptionStore>,
    clock: Arc<dyn Clock>,
    state: RwLock<SchedulerState>,
    executing: AtomicBool,
    events: Mutex<Vec<MaintenanceEvent>>,
}

impl fmt::Debug for MaintenanceScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaintenanceScheduler")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl MaintenanceScheduler {
    /// Creates a scheduler and seeds both active indexes from the stores.
    ///
    /// Users are indexed from `UserStore::list`, prescriptions from
    /// `PrescriptionStore::active_ids`.
    pub fn new(
        config: MaintenanceConfig,
        user_store: Arc<dyn UserStore>,
        prescription_store: Arc<dyn PrescriptionStore>,
        clock: Arc<dyn Clock>,
    ) -> MaintenanceResult<Self> {
        config.validate()?;

        let mut gate = ExecutionGate::new(config.administrator)?;
        if let Some(executor) = config.executor_identity {
            gate.set_executor(config.administrator, executor)?;
        }

        let users = DomainIndex::seed(Domain::Users, user_store.list()?, config.user_batch_size)?;
        let prescriptions = DomainIndex::seed(
            Domain::Prescriptions,
            prescription_store.active_ids()?,
            config.prescription_batch_size,
        )?;
        let user_rule = UserInactivity::new(config.inactivity_period()?)?;

        info!(
            "Maintenance scheduler ready: {} users, {} active prescriptions",
            users.registry.count(),
            prescriptions.registry.count()
        );

        Ok(Self {
            user_store,
            prescription_store,
            clock,
            state: RwLock::new(SchedulerState {
                users,
                prescriptions,
                gate,
                user_rule,
            }),
            executing: AtomicBool::new(false),
            events: Mutex::new(Vec::new()),
        })
    }

    fn read(&self) -> MaintenanceResult<RwLockReadGuard<'_, SchedulerState>> {
        self.state.read().map_err(|_| MaintenanceError::LockPoisoned)
    }

    fn write(&self) -> MaintenanceResult<RwLockWriteGuard<'_, SchedulerState>> {
        self.state.write().map_err(|_| MaintenanceError::LockPoisoned)
    }

    fn emit(&self, event: MaintenanceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    // ── Check phase ──────────────────────────────────────────────

    /// Computes the plan for the current cursor windows.
    ///
    /// Read-only and repeatable: two calls with no execute and no store
    /// mutation in between return the same outcome. An index entry the
    /// store does not know aborts the check with `IndexMismatch`.
    pub fn check_cycle(&self) -> MaintenanceResult<CheckOutcome> {
        let now = self.clock.now();
        let state = self.read()?;

        let users = state
            .users
            .plan(Domain::Users, &state.user_rule, now, |id| self.user_store.get(id))
            .inspect_err(log_invariant)?;
        let prescriptions = state
            .prescriptions
            .plan(Domain::Prescriptions, &PrescriptionExpiry, now, |id| {
                self.prescription_store.get(id)
            })
            .inspect_err(log_invariant)?;

        let outcome = CheckOutcome::from_plan(ExecutionPlan::new(users, prescriptions));
        debug!(
            "Check: {} stale users, {} expired prescriptions",
            outcome.plan.users().len(),
            outcome.plan.prescriptions().len()
        );
        Ok(outcome)
    }

    // ── Execute phase ────────────────────────────────────────────

    /// Decodes plan bytes and executes them.
    ///
    /// The caller is authorized before the bytes are looked at.
    pub fn execute_encoded(&self, caller: Principal, bytes: &[u8]) -> MaintenanceResult<CycleReport> {
        self.read()?.gate.authorize_execute(caller)?;
        let plan = ExecutionPlan::decode(bytes)?;
        self.execute_cycle(caller, &plan)
    }

    /// Applies a plan produced by [`check_cycle`](Self::check_cycle).
    ///
    /// Every identifier is re-read and re-checked at the execute-time clock;
    /// ones that no longer qualify, or whose mutation fails, are recorded in
    /// the report and the rest of the batch proceeds. Cursors advance once per
    /// domain after all identifiers are processed. A plan that would mutate
    /// a prescription missing from its index is refused before any store
    /// mutation; any other broken index invariant aborts the cycle before
    /// any cursor moves.
    pub fn execute_cycle(&self, caller: Principal, plan: &ExecutionPlan) -> MaintenanceResult<CycleReport> {
        let user_rule = {
            let state = self.read()?;
            state.gate.authorize_execute(caller)?;
            state.user_rule
        };
        if plan.is_empty() {
            return Err(MaintenanceError::EmptyPlan);
        }
        let _guard = ExecutionGuard::acquire(&self.executing)?;

        let now = self.clock.now();
        let mut report = CycleReport::new();
        info!(
            "Executing plan: {} users, {} prescriptions",
            plan.users().len(),
            plan.prescriptions().len()
        );

        self.ensure_tracked(
            plan.prescriptions(),
            &PrescriptionExpiry,
            now,
            |id| self.prescription_store.get(id),
        )?;

        self.apply_domain(
            plan.users(),
            &user_rule,
            now,
            |id| self.user_store.get(id),
            |id| self.user_store.deactivate(id),
            &mut report,
        )?;
        self.apply_domain(
            plan.prescriptions(),
            &PrescriptionExpiry,
            now,
            |id| self.prescription_store.get(id),
            |id| self.prescription_store.invalidate(id),
            &mut report,
        )?;

        {
            let mut state = self.write()?;
            let user_count = state.users.registry.count();
            state.users.cursor.advance(user_count);
            let prescription_count = state.prescriptions.registry.count();
            state.prescriptions.cursor.advance(prescription_count);
            report.user_cursor = state.users.cursor.state();
            report.prescription_cursor = state.prescriptions.cursor.state();
        }

        info!(
            "Cycle complete: {} succeeded, {} failed",
            report.success_count(),
            report.failure_count()
        );
        self.emit(MaintenanceEvent::CycleCompleted {
            succeeded: report.success_count(),
            failed: report.failure_count(),
            user_cursor: report.user_cursor,
            prescription_cursor: report.prescription_cursor,
        });
        Ok(report)
    }

    /// Refuses a plan that would mutate an identifier its index does not
    /// hold, before anything is applied.
    ///
    /// Only domains that drop mutated identifiers from their index are
    /// checked. An untracked identifier that is no longer stale is left to
    /// `apply_domain`, which records it as a per-item failure.
    fn ensure_tracked<Id, R>(
        &self,
        ids: &[Id],
        rule: &R,
        now: DateTime<Utc>,
        lookup: impl Fn(&Id) -> StoreResult<Option<R::Record>>,
    ) -> MaintenanceResult<()>
    where
        Id: DomainKey,
        R: StalenessRule,
    {
        if !Id::DOMAIN.removes_on_mutation() {
            return Ok(());
        }
        let untracked: Vec<Id> = {
            let state = self.read()?;
            let registry = &Id::index(&state).registry;
            ids.iter().copied().filter(|id| !registry.contains(id)).collect()
        };
        for id in untracked {
            if matches!(lookup(&id), Ok(Some(record)) if rule.is_stale(&record, now)) {
                return Err(untracked_error(id)).inspect_err(log_invariant);
            }
        }
        Ok(())
    }

    fn apply_domain<Id, R>(
        &self,
        ids: &[Id],
        rule: &R,
        now: DateTime<Utc>,
        lookup: impl Fn(&Id) -> StoreResult<Option<R::Record>>,
        mutate: impl Fn(&Id) -> StoreResult<()>,
        report: &mut CycleReport,
    ) -> MaintenanceResult<()>
    where
        Id: DomainKey,
        R: StalenessRule,
    {
        for &id in ids {
            let target = id.entity_ref();
            match lookup(&id) {
                Ok(Some(record)) if rule.is_stale(&record, now) => {}
                Ok(Some(_)) => {
                    debug!("Skipping {}: no longer eligible", target);
                    report.record_failure(target, FailureKind::NotEligible, "no longer eligible".into());
                    continue;
                }
                Ok(None) => {
                    warn!("Skipping {}: unknown to store", target);
                    report.record_failure(target, FailureKind::NotFound, "unknown to store".into());
                    continue;
                }
                Err(e) => {
                    warn!("Failed to load {}: {}", target, e);
                    report.record_failure(target, FailureKind::from(&e), e.to_string());
                    continue;
                }
            }

            if Id::DOMAIN.removes_on_mutation()
                && !Id::index(&*self.read()?).registry.contains(&id)
            {
                return Err(untracked_error(id)).inspect_err(log_invariant);
            }

            if let Err(e) = mutate(&id) {
                warn!("Failed to apply {}: {}", target, e);
                report.record_failure(target, FailureKind::from(&e), e.to_string());
                continue;
            }

            if Id::DOMAIN.removes_on_mutation() {
                let mut state = self.write()?;
                Id::index_mut(&mut state)
                    .registry
                    .remove(&id)
                    .map_err(|e| e.in_domain(Id::DOMAIN))
                    .inspect_err(log_invariant)?;
            }

            debug!("Applied {}", target);
            report.record_success(target);
            self.emit(id.applied_event());
        }
        Ok(())
    }

    /// Whether an execute is in flight.
    #[must_use]
    pub fn phase(&self) -> SchedulerPhase {
        if self.executing.load(Ordering::Acquire) {
            SchedulerPhase::Executing
        } else {
            SchedulerPhase::Idle
        }
    }

    // ── Administration ───────────────────────────────────────────

    /// Designates the executor. Returns false if it was already designated.
    pub fn set_executor(&self, caller: Principal, executor: Principal) -> MaintenanceResult<bool> {
        let mut state = self.write()?;
        let previous = state.gate.executor();
        let changed = state.gate.set_executor(caller, executor)?;
        drop(state);
        if changed {
            self.emit(MaintenanceEvent::ExecutorChanged {
                previous,
                current: executor,
            });
        }
        Ok(changed)
    }

    /// Hands administration to another principal.
    pub fn transfer_administration(
        &self,
        caller: Principal,
        administrator: Principal,
    ) -> MaintenanceResult<bool> {
        let mut state = self.write()?;
        let previous = state.gate.administrator();
        let changed = state.gate.transfer_administration(caller, administrator)?;
        drop(state);
        if changed {
            self.emit(MaintenanceEvent::AdministrationTransferred {
                previous,
                current: administrator,
            });
        }
        Ok(changed)
    }

    /// Changes how many identifiers a domain examines per cycle.
    pub fn set_batch_size(
        &self,
        caller: Principal,
        domain: Domain,
        batch_size: usize,
    ) -> MaintenanceResult<()> {
        let mut state = self.write()?;
        state.gate.authorize_admin(caller)?;
        match domain {
            Domain::Users => state.users.cursor.set_batch_size(batch_size)?,
            Domain::Prescriptions => state.prescriptions.cursor.set_batch_size(batch_size)?,
        }
        drop(state);
        info!("{} batch size set to {}", domain, batch_size);
        self.emit(MaintenanceEvent::BatchSizeChanged { domain, batch_size });
        Ok(())
    }

    /// Changes the age after which an unused account is stale.
    ///
    /// This value is authoritative: the next check evaluates users against it.
    pub fn set_inactivity_period(&self, caller: Principal, period: Duration) -> MaintenanceResult<()> {
        let mut state = self.write()?;
        state.gate.authorize_admin(caller)?;
        state.user_rule = UserInactivity::new(period)?;
        drop(state);
        info!("User inactivity period set to {}s", period.num_seconds());
        self.emit(MaintenanceEvent::InactivityPeriodChanged {
            seconds: period.num_seconds(),
        });
        Ok(())
    }

    /// Re-seeds both active indexes from the stores.
    ///
    /// Refused while an execute is in flight. Cursors keep their positions,
    /// reduced into range of the new domain sizes.
    pub fn rebuild_indexes(&self, caller: Principal) -> MaintenanceResult<()> {
        self.read()?.gate.authorize_admin(caller)?;
        let _guard = ExecutionGuard::acquire(&self.executing)?;

        let users = ActiveIndexRegistry::from_ids(self.user_store.list()?)
            .map_err(|e| e.in_domain(Domain::Users))?;
        let prescriptions = ActiveIndexRegistry::from_ids(self.prescription_store.active_ids()?)
            .map_err(|e| e.in_domain(Domain::Prescriptions))?;

        let mut state = self.write()?;
        state.users.registry = users;
        state.prescriptions.registry = prescriptions;
        let user_count = state.users.registry.count();
        state.users.cursor.clamp(user_count);
        let prescription_count = state.prescriptions.registry.count();
        state.prescriptions.cursor.clamp(prescription_count);
        info!(
            "Rebuilt indexes: {} users, {} active prescriptions",
            user_count, prescription_count
        );
        Ok(())
    }

    /// Brings both active indexes in line with the stores.
    ///
    /// Users and valid prescriptions the stores know but the indexes lack are
    /// appended; prescriptions no longer valid are dropped the same way an
    /// execute drops them. Cursors are reduced into range. Unlike
    /// [`rebuild_indexes`](Self::rebuild_indexes) this needs no
    /// administrator and does not re-seed slots that are still current.
    /// Refused while an execute is in flight. Returns the number of
    /// identifiers added or dropped.
    pub fn refresh_indexes(&self) -> MaintenanceResult<usize> {
        let _guard = ExecutionGuard::acquire(&self.executing)?;

        let users = self.user_store.list()?;
        let ordered = self.prescription_store.active_ids()?;
        let active: HashSet<PrescriptionId> = ordered.iter().copied().collect();

        let mut state = self.write()?;
        let mut changes = 0;
        for id in users {
            if !state.users.registry.contains(&id) {
                state.users.registry.add(id).map_err(|e| e.in_domain(Domain::Users))?;
                changes += 1;
            }
        }
        let dropped: Vec<PrescriptionId> = state
            .prescriptions
            .registry
            .iter()
            .copied()
            .filter(|id| !active.contains(id))
            .collect();
        for id in &dropped {
            state
                .prescriptions
                .registry
                .remove(id)
                .map_err(|e| e.in_domain(Domain::Prescriptions))?;
        }
        changes += dropped.len();
        for id in ordered {
            if !state.prescriptions.registry.contains(&id) {
                state
                    .prescriptions
                    .registry
                    .add(id)
                    .map_err(|e| e.in_domain(Domain::Prescriptions))?;
                changes += 1;
            }
        }

        let user_count = state.users.registry.count();
        state.users.cursor.clamp(user_count);
        let prescription_count = state.prescriptions.registry.count();
        state.prescriptions.cursor.clamp(prescription_count);
        drop(state);

        if changes > 0 {
            info!(
                "Refreshed indexes: {} changes, {} users, {} active prescriptions",
                changes, user_count, prescription_count
            );
        }
        Ok(changes)
    }

    // ── Index tracking ───────────────────────────────────────────

    /// Adds a newly registered user to the active index.
    pub fn track_user(&self, id: UserId) -> MaintenanceResult<()> {
        if self.user_store.get(&id)?.is_none() {
            return Err(MaintenanceError::NotFound {
                domain: Domain::Users,
                id: id.to_string(),
            });
        }
        self.track(id)
    }

    /// Adds a newly issued prescription to the active index.
    ///
    /// Only `Valid` prescriptions can be tracked.
    pub fn track_prescription(&self, id: PrescriptionId) -> MaintenanceResult<()> {
        match self.prescription_store.get(&id)? {
            Some(rx) if rx.status == PrescriptionStatus::Valid => self.track(id),
            _ => Err(MaintenanceError::NotFound {
                domain: Domain::Prescriptions,
                id: id.to_string(),
            }),
        }
    }

    fn track<Id: DomainKey>(&self, id: Id) -> MaintenanceResult<()> {
        let mut state = self.write()?;
        Id::index_mut(&mut state)
            .registry
            .add(id)
            .map_err(|e| e.in_domain(Id::DOMAIN))
            .inspect_err(log_invariant)?;
        debug!("Tracking {}", id.entity_ref());
        Ok(())
    }

    // ── Introspection ────────────────────────────────────────────

    /// Number of identifiers in a domain's active index.
    pub fn domain_count(&self, domain: Domain) -> MaintenanceResult<usize> {
        let state = self.read()?;
        Ok(match domain {
            Domain::Users => UserId::index(&state).registry.count(),
            Domain::Prescriptions => PrescriptionId::index(&state).registry.count(),
        })
    }

    /// Copy of the user index in slot order.
    pub fn user_index(&self) -> MaintenanceResult<RegistrySnapshot<UserId>> {
        Ok(self.read()?.users.registry.snapshot())
    }

    /// Copy of the prescription index in slot order.
    pub fn prescription_index(&self) -> MaintenanceResult<RegistrySnapshot<PrescriptionId>> {
        Ok(self.read()?.prescriptions.registry.snapshot())
    }

    /// Current cursor for each domain.
    pub fn cursor_state(&self) -> MaintenanceResult<CursorSnapshot> {
        let state = self.read()?;
        Ok(CursorSnapshot {
            users: state.users.cursor.state(),
            prescriptions: state.prescriptions.cursor.state(),
        })
    }

    /// Restores persisted cursor positions.
    ///
    /// Batch sizes are configuration and are left untouched; only positions
    /// are taken from the snapshot, reduced into range. Refused while an
    /// execute is in flight.
    pub fn restore_cursors(&self, snapshot: CursorSnapshot) -> MaintenanceResult<()> {
        let _guard = ExecutionGuard::acquire(&self.executing)?;
        let mut state = self.write()?;

        let count = state.users.registry.count();
        let batch = state.users.cursor.batch_size();
        state.users.cursor = BatchCursor::restore(
            CursorState {
                position: snapshot.users.position,
                batch_size: batch,
            },
            count,
        )?;

        let count = state.prescriptions.registry.count();
        let batch = state.prescriptions.cursor.batch_size();
        state.prescriptions.cursor = BatchCursor::restore(
            CursorState {
                position: snapshot.prescriptions.position,
                batch_size: batch,
            },
            count,
        )?;
        Ok(())
    }

    /// The designated executor, if any.
    pub fn executor(&self) -> MaintenanceResult<Option<Principal>> {
        Ok(self.read()?.gate.executor())
    }

    /// The administrator.
    pub fn administrator(&self) -> MaintenanceResult<Principal> {
        Ok(self.read()?.gate.administrator())
    }

    /// The inactivity period users are evaluated against.
    pub fn inactivity_period(&self) -> MaintenanceResult<Duration> {
        Ok(self.read()?.user_rule.inactivity_period())
    }

    /// Takes every event emitted since the last drain.
    pub fn drain_events(&self) -> Vec<MaintenanceEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

fn untracked_error<Id: DomainKey>(id: Id) -> MaintenanceError {
    MaintenanceError::NotFound {
        domain: Id::DOMAIN,
        id: id.to_string(),
    }
}

fn log_invariant(err: &MaintenanceError) {
    if err.is_invariant_violation() {
        error!("Index invariant violated: {}", err);
    }
}
