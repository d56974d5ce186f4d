use std::time::Duration;

use coachline_core::plan::PlanStatus;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::PollIntervals;
use crate::state::LifecycleState;

/// Desired polling behavior for a lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSchedule {
    Stopped,
    Polling { interval: Duration },
}

impl PollSchedule {
    /// Poll only for an authenticated session whose status is transient.
    pub fn for_state(state: &LifecycleState, intervals: &PollIntervals) -> Self {
        if !state.authenticated {
            return Self::Stopped;
        }
        match state.plan_status.and_then(|status| intervals.for_status(status)) {
            Some(interval) => Self::Polling { interval },
            None => Self::Stopped,
        }
    }
}

/// Every tick reads the plan status endpoint. While generating it also reads the
/// profile, which is where completion shows up first.
pub fn tick_reads_profile(status: Option<PlanStatus>) -> bool {
    status == Some(PlanStatus::Generating)
}

/// Owns the single poll timer. Every schedule change bumps the generation, so
/// a timer or tick from a previous schedule can tell it is no longer current.
#[derive(Debug, Default)]
pub(crate) struct Poller {
    schedule: Option<PollSchedule>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl Poller {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn schedule(&self) -> PollSchedule {
        self.schedule.unwrap_or(PollSchedule::Stopped)
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.timer.is_some() && self.generation == generation
    }

    pub(crate) fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Move to `next`. The previous timer is aborted before this returns.
    /// Returns the generation and interval of the timer the caller must start.
    pub(crate) fn transition(&mut self, next: PollSchedule) -> Option<(u64, Duration)> {
        if self.schedule() == next && (next == PollSchedule::Stopped || self.timer.is_some()) {
            return None;
        }
        self.cancel_timer();
        self.schedule = Some(next);
        match next {
            PollSchedule::Stopped => {
                info!(generation = self.generation, "plan status polling stopped");
                None
            }
            PollSchedule::Polling { interval } => {
                info!(
                    generation = self.generation,
                    interval_ms = interval.as_millis() as u64,
                    "plan status polling started"
                );
                Some((self.generation, interval))
            }
        }
    }

    /// Install the timer for `generation`. A timer for an outdated generation is aborted.
    pub(crate) fn attach(&mut self, generation: u64, timer: JoinHandle<()>) {
        if generation != self.generation || self.timer.is_some() {
            timer.abort();
            return;
        }
        self.timer = Some(timer);
    }

    pub(crate) fn stop(&mut self) {
        if self.timer.is_some() {
            debug!(generation = self.generation, "tearing down poll timer");
        }
        self.cancel_timer();
        self.schedule = Some(PollSchedule::Stopped);
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation += 1;
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
