//! In-crate fakes for the identity and plan status services.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use coachline_core::plan::{PlanStatus, PlanStatusRecord};
use coachline_core::profile::{OnboardingSubmission, ProfileSnapshot};
use parking_lot::Mutex;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::error::SourceError;
use crate::sources::{IdentityService, PlanStatusService};

pub(crate) fn profile(onboarding_completed: bool, status: Option<PlanStatus>) -> ProfileSnapshot {
    ProfileSnapshot {
        id: Uuid::nil(),
        onboarding_completed,
        plan_status: status,
    }
}

/// Let spawned tasks and fired timers run to completion.
pub(crate) async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Let paused time run just past `duration`, firing every timer due on the way.
pub(crate) async fn elapse(duration: Duration) {
    settle().await;
    tokio::time::sleep(duration + Duration::from_millis(1)).await;
    settle().await;
}

fn unavailable() -> SourceError {
    SourceError::Status {
        status: 503,
        body: None,
    }
}

/// Takes a one-shot gate and waits on it, modelling a read still in flight.
async fn pass(gate: &Mutex<Option<Arc<Notify>>>) {
    let gate = gate.lock().take();
    if let Some(gate) = gate {
        gate.notified().await;
    }
}

fn install_gate(slot: &Mutex<Option<Arc<Notify>>>) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    *slot.lock() = Some(gate.clone());
    gate
}

#[derive(Default)]
pub(crate) struct FakeIdentity {
    profile: Mutex<Option<ProfileSnapshot>>,
    onboarding_result: Mutex<Option<ProfileSnapshot>>,
    fail_next: AtomicBool,
    profile_reads: AtomicUsize,
    onboarding_writes: AtomicUsize,
    read_gate: Mutex<Option<Arc<Notify>>>,
    write_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeIdentity {
    pub(crate) fn new(profile: Option<ProfileSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            profile: Mutex::new(profile),
            ..Self::default()
        })
    }

    pub(crate) fn set_profile(&self, profile: Option<ProfileSnapshot>) {
        *self.profile.lock() = profile;
    }

    pub(crate) fn set_onboarding_result(&self, profile: ProfileSnapshot) {
        *self.onboarding_result.lock() = Some(profile);
    }

    pub(crate) fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// The next profile read captures its answer, then blocks until the gate is notified.
    pub(crate) fn read_gate(&self) -> Arc<Notify> {
        install_gate(&self.read_gate)
    }

    /// The next onboarding write blocks until the returned gate is notified.
    pub(crate) fn write_gate(&self) -> Arc<Notify> {
        install_gate(&self.write_gate)
    }

    pub(crate) fn profile_reads(&self) -> usize {
        self.profile_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn onboarding_writes(&self) -> usize {
        self.onboarding_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn fetch_profile(&self) -> Result<Option<ProfileSnapshot>, SourceError> {
        self.profile_reads.fetch_add(1, Ordering::SeqCst);
        let answer = if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(self.profile.lock().clone())
        };
        pass(&self.read_gate).await;
        answer
    }

    async fn save_onboarding(
        &self,
        _submission: &OnboardingSubmission,
    ) -> Result<ProfileSnapshot, SourceError> {
        self.onboarding_writes.fetch_add(1, Ordering::SeqCst);
        let result = self.onboarding_result.lock().clone();
        pass(&self.write_gate).await;
        let profile = result.ok_or_else(unavailable)?;
        self.set_profile(Some(profile.clone()));
        Ok(profile)
    }
}

#[derive(Default)]
pub(crate) struct FakePlans {
    record: Mutex<Option<PlanStatusRecord>>,
    fail_next: AtomicBool,
    reads: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakePlans {
    /// `None` answers every read with not-found.
    pub(crate) fn new(record: Option<PlanStatusRecord>) -> Arc<Self> {
        Arc::new(Self {
            record: Mutex::new(record),
            ..Self::default()
        })
    }

    pub(crate) fn set_record(&self, record: Option<PlanStatusRecord>) {
        *self.record.lock() = record;
    }

    pub(crate) fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// The next read captures its answer, then blocks until the gate is notified.
    pub(crate) fn gate(&self) -> Arc<Notify> {
        install_gate(&self.gate)
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanStatusService for FakePlans {
    async fn fetch_plan_status(&self) -> Result<Option<PlanStatusRecord>, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let answer = if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(self.record.lock().clone())
        };
        pass(&self.gate).await;
        answer
    }
}
