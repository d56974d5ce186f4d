use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use coachline_core::plan::{PlanStatus, PlanStatusRecord};
use coachline_core::profile::OnboardingSubmission;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::PollIntervals;
use crate::error::EngineError;
use crate::flight::SingleFlight;
use crate::guard::{GuardDriver, RouteSegment, ScreenAccess, screen_access};
use crate::identity::{IdentityOperation, SessionEvent};
use crate::poller::{PollSchedule, Poller, tick_reads_profile};
use crate::reconciler::{Adoption, ReadTicket, Reconciler, SessionChange};
use crate::review::ReviewScreen;
use crate::sources::{IdentityService, PlanStatusService};
use crate::state::LifecycleState;

/// Result of a plan status refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A read was issued and its result applied.
    Completed(Adoption),
    /// Another read was already in flight; this request was dropped.
    Coalesced,
    /// No session, nothing to read.
    Skipped,
}

/// Handle to the plan lifecycle engine. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct PlanLifecycle {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    identity: Arc<dyn IdentityService>,
    plans: Arc<dyn PlanStatusService>,
    intervals: PollIntervals,
    reconciler: Mutex<Reconciler>,
    state_tx: watch::Sender<LifecycleState>,
    poller: Mutex<Poller>,
    plan_fetch: SingleFlight,
    onboarding_write: SingleFlight,
    pub(crate) identity_op: SingleFlight,
    closed: AtomicBool,
}

impl PlanLifecycle {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        plans: Arc<dyn PlanStatusService>,
        intervals: PollIntervals,
    ) -> Self {
        let reconciler = Reconciler::new();
        let (state_tx, _) = watch::channel(reconciler.state().clone());
        Self {
            shared: Arc::new(Shared {
                identity,
                plans,
                intervals,
                reconciler: Mutex::new(reconciler),
                state_tx,
                poller: Mutex::new(Poller::new()),
                plan_fetch: SingleFlight::new(),
                onboarding_write: SingleFlight::new(),
                identity_op: SingleFlight::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Reactive lifecycle value.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.shared.state_tx.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn poll_schedule(&self) -> PollSchedule {
        self.shared.poller.lock().schedule()
    }

    /// Passive session change from the identity subscription.
    /// Ignored while an explicit identity operation is in progress.
    pub async fn handle_session_event(&self, event: SessionEvent) {
        if self.shared.identity_op.is_busy() {
            debug!(?event, "ignoring session event during explicit identity operation");
            return;
        }
        if let Some(change) = self.shared.transition_session(&event) {
            self.shared.load_for(change).await;
        }
    }

    /// Consume identity events in order. Session transitions are applied inline;
    /// the source reads after a sign-in run in their own task so the listener
    /// never blocks on the network.
    pub fn spawn_session_listener(
        &self,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> JoinHandle<()> {
        let shared = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(engine) = shared.upgrade() else {
                    break;
                };
                if engine.identity_op.is_busy() {
                    debug!(?event, "ignoring session event during explicit identity operation");
                    continue;
                }
                match engine.transition_session(&event) {
                    Some(change) if change != SessionChange::Ended => {
                        tokio::spawn(async move { engine.load_for(change).await });
                    }
                    _ => {}
                }
            }
        })
    }

    /// Start an explicit login, registration or account-link flow.
    pub fn begin_identity_operation(&self) -> Result<IdentityOperation, EngineError> {
        if !self.shared.identity_op.try_begin() {
            return Err(EngineError::OperationInProgress);
        }
        Ok(IdentityOperation::new(self.shared.clone()))
    }

    /// User-initiated plan status refresh. Shows loading until the read answers.
    pub async fn refresh_plan_status(&self) -> RefreshOutcome {
        self.shared.refresh_plan_status(true).await
    }

    /// Explicit "refresh identity": re-read the profile snapshot.
    pub async fn refresh_identity(&self) {
        self.shared.refresh_profile().await;
    }

    /// Pull-to-refresh: both sources.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.shared.refresh_both(true).await
    }

    /// Save onboarding answers. A second submission while one is pending is rejected.
    ///
    /// The profile returned by the write is applied as a fresh source-A read, so a
    /// `GENERATING` status is adopted without waiting for the plan status endpoint.
    pub async fn submit_onboarding(
        &self,
        submission: &OnboardingSubmission,
    ) -> Result<LifecycleState, EngineError> {
        let shared = &self.shared;
        let Some(_write) = shared.onboarding_write.try_acquire() else {
            return Err(EngineError::WriteInFlight);
        };
        let ticket = {
            let mut reconciler = shared.reconciler.lock();
            if !reconciler.is_authenticated() {
                return Err(EngineError::NotAuthenticated);
            }
            reconciler.issue()
        };

        let profile = shared.identity.save_onboarding(submission).await?;
        info!(
            plan_status = ?profile.plan_status,
            onboarding_completed = profile.onboarding_completed,
            "onboarding saved"
        );

        let mut reconciler = shared.reconciler.lock();
        // Ordered after every read issued while the write was pending.
        let ticket = reconciler.reissue(ticket);
        reconciler.apply_profile(ticket, Some(profile));
        shared.publish_locked(&reconciler);
        Ok(reconciler.state().clone())
    }

    /// Capability for the review screen's leave action.
    pub fn review_screen(&self) -> ReviewScreen {
        ReviewScreen::new(self.shared.clone())
    }

    /// Dismiss the "your plan changed" notice for the current version.
    pub fn acknowledge_plan_update(&self) -> bool {
        let mut reconciler = self.shared.reconciler.lock();
        let changed = reconciler.acknowledge_plan_update();
        if changed {
            self.shared.publish_locked(&reconciler);
        }
        changed
    }

    /// Global guard bound to this engine's state and the router's current segment.
    pub fn guard_driver(&self, route: watch::Receiver<RouteSegment>) -> GuardDriver {
        GuardDriver::new(self.subscribe(), route)
    }

    /// Per-screen check. Read-only: never issues a redirect.
    pub fn screen_access(&self, required: PlanStatus) -> ScreenAccess {
        screen_access(&self.shared.state_tx.borrow(), required)
    }

    /// Engine teardown: stop polling for good. Reads still in flight are ignored.
    pub fn shutdown(&self) {
        self.shared.closed.store(true, Ordering::Release);
        let mut reconciler = self.shared.reconciler.lock();
        reconciler.end_session();
        self.shared.poller.lock().stop();
        self.shared.publish_locked(&reconciler);
        info!("plan lifecycle engine shut down");
    }
}

impl Shared {
    /// Apply a session change. `None` once the engine is shut down.
    pub(crate) fn transition_session(self: &Arc<Self>, event: &SessionEvent) -> Option<SessionChange> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        let mut reconciler = self.reconciler.lock();
        let change = match event {
            SessionEvent::SignedIn(principal) => {
                let change = reconciler.sign_in(&principal.subject);
                info!(subject = %principal.subject, ?change, "signed in");
                change
            }
            SessionEvent::SignedOut => {
                info!("signed out");
                reconciler.end_session()
            }
        };
        self.publish_locked(&reconciler);
        Some(change)
    }

    /// Load what a session change calls for: both sources for a new session,
    /// the profile alone when the same principal is re-announced.
    pub(crate) async fn load_for(self: &Arc<Self>, change: SessionChange) {
        match change {
            SessionChange::Started => {
                self.refresh_both(true).await;
            }
            SessionChange::Renewed => {
                self.refresh_profile().await;
            }
            SessionChange::Ended => {}
        }
    }

    /// Read both sources concurrently. The status read is issued first, so a
    /// profile status adopted while it is in flight outranks its answer.
    async fn refresh_both(self: &Arc<Self>, show_loading: bool) -> RefreshOutcome {
        let (outcome, _) = tokio::join!(
            self.refresh_plan_status(show_loading),
            self.refresh_profile()
        );
        outcome
    }

    pub(crate) async fn refresh_profile(self: &Arc<Self>) -> Adoption {
        let Some(ticket) = self.issue_if_authenticated() else {
            return Adoption::Irrelevant;
        };
        let result = self.identity.fetch_profile().await;

        let mut reconciler = self.reconciler.lock();
        let adoption = match result {
            Ok(profile) => reconciler.apply_profile(ticket, profile),
            Err(err) => {
                warn!(error = %err, seq = ticket.seq(), "profile refresh failed; keeping previous snapshot");
                reconciler.profile_failed(ticket)
            }
        };
        self.publish_locked(&reconciler);
        adoption
    }

    pub(crate) async fn refresh_plan_status(self: &Arc<Self>, show_loading: bool) -> RefreshOutcome {
        let Some(_flight) = self.plan_fetch.try_acquire() else {
            debug!("plan status read already in flight; dropping request");
            return RefreshOutcome::Coalesced;
        };
        let ticket = {
            let mut reconciler = self.reconciler.lock();
            if !reconciler.is_authenticated() {
                reconciler.skip_unauthenticated();
                self.publish_locked(&reconciler);
                return RefreshOutcome::Skipped;
            }
            if show_loading {
                reconciler.show_loading();
                self.publish_locked(&reconciler);
            }
            reconciler.issue()
        };

        let result = self.plans.fetch_plan_status().await;

        let mut reconciler = self.reconciler.lock();
        let adoption = match result {
            Ok(Some(record)) => reconciler.apply_plan_status(ticket, record),
            Ok(None) => {
                debug!(seq = ticket.seq(), "no plan resource for user");
                reconciler.apply_plan_status(ticket, PlanStatusRecord::no_plan())
            }
            Err(err) => {
                warn!(error = %err, seq = ticket.seq(), "plan status refresh failed; keeping previous state");
                reconciler.plan_status_failed(ticket)
            }
        };
        self.publish_locked(&reconciler);
        RefreshOutcome::Completed(adoption)
    }

    pub(crate) fn mark_pending_approval_seen(self: &Arc<Self>) -> bool {
        let mut reconciler = self.reconciler.lock();
        let changed = reconciler.mark_pending_approval_seen();
        if changed {
            info!("review screen left; pending approval will no longer force navigation");
            self.publish_locked(&reconciler);
        }
        changed
    }

    fn issue_if_authenticated(&self) -> Option<ReadTicket> {
        let mut reconciler = self.reconciler.lock();
        reconciler.is_authenticated().then(|| reconciler.issue())
    }

    /// Publish the state and bring the poller in line with it. Called with the
    /// reconciler locked so publishes and poller transitions happen in state order.
    fn publish_locked(self: &Arc<Self>, reconciler: &Reconciler) {
        let state = reconciler.state();
        self.state_tx.send_if_modified(|current| {
            if current == state {
                return false;
            }
            *current = state.clone();
            true
        });

        let schedule = if self.closed.load(Ordering::Acquire) {
            PollSchedule::Stopped
        } else {
            PollSchedule::for_state(state, &self.intervals)
        };
        let mut poller = self.poller.lock();
        if let Some((generation, interval)) = poller.transition(schedule) {
            poller.attach(generation, spawn_timer(Arc::downgrade(self), generation, interval));
        }
    }

    async fn poll_tick(self: Arc<Self>, generation: u64) {
        if !self.poller.lock().is_current(generation) {
            debug!(generation, "dropping tick from a cancelled poll timer");
            return;
        }
        let status = self.reconciler.lock().state().plan_status;
        debug!(generation, status = ?status, "plan status poll tick");
        if tick_reads_profile(status) {
            self.refresh_both(false).await;
        } else {
            self.refresh_plan_status(false).await;
        }
    }
}

/// The poll timer. Each tick runs in its own task so cancelling the timer never
/// cancels a read that has already started.
fn spawn_timer(shared: Weak<Shared>, generation: u64, interval: Duration) -> JoinHandle<()> {
    // Deadline counts from the schedule change, not from the task's first poll.
    let first_tick = Instant::now() + interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(first_tick, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(engine) = shared.upgrade() else {
                break;
            };
            if !engine.poller.lock().is_current(generation) {
                break;
            }
            tokio::spawn(engine.poll_tick(generation));
        }
    })
}
