//! Merges the profile snapshot (source A) and the plan status endpoint (source B)
//! into one [`LifecycleState`].
//!
//! Precedence:
//! - A's `plan_status` wins on conflict: it is adopted as soon as it differs from
//!   the current status, whichever source set that status.
//! - B replaces `status`, `version` and `updated_at` together and is the only
//!   source of `version` and `updated_at`. Its status is held back when A adopted
//!   a status after the B read was issued.
//! - Every read carries a [`ReadTicket`] taken when it was issued. Within one
//!   source a completion older than the last applied one is dropped, and a
//!   completion from a previous session is ignored outright.

use coachline_core::plan::{PlanStatus, PlanStatusRecord};
use coachline_core::profile::ProfileSnapshot;
use tracing::{debug, info};

use crate::state::LifecycleState;

/// Identifies one source read: the session it belongs to and its issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTicket {
    seq: u64,
    session: u64,
}

impl ReadTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What a resolution did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adoption {
    /// The status changed.
    Adopted,
    /// Applied, but the status stayed the same.
    Unchanged,
    /// Out of order: a newer read already set the status.
    Stale,
    /// Belongs to a session that has ended.
    Irrelevant,
}

/// Effect of a session event on the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// New session: both sources must be loaded.
    Started,
    /// Same principal signed in again: only the profile needs a refresh.
    Renewed,
    Ended,
}

#[derive(Debug)]
pub struct Reconciler {
    state: LifecycleState,
    session: u64,
    next_seq: u64,
    principal: Option<String>,
    /// Ticket sequence of the last applied plan status read.
    plan_seq: u64,
    /// Ticket sequence of the last applied profile.
    profile_seq: u64,
    /// Stamp taken when a profile last changed the status. Plan status reads
    /// issued before it cannot replace that status.
    profile_status_at: u64,
    profile_resolved: bool,
    plan_resolved: bool,
    refresh_pending: bool,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::initial(),
            session: 0,
            next_seq: 1,
            principal: None,
            plan_seq: 0,
            profile_seq: 0,
            profile_status_at: 0,
            profile_resolved: false,
            plan_resolved: false,
            refresh_pending: false,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.authenticated
    }

    /// A signed-in event. A new principal (or the first sign-in) starts a fresh
    /// session: everything back to "undetermined", loading until both sources
    /// answer. The same principal again is a renewal and keeps the state.
    pub fn sign_in(&mut self, subject: &str) -> SessionChange {
        if self.state.authenticated && self.principal.as_deref() == Some(subject) {
            debug!(session = self.session, "session renewed for the same principal");
            return SessionChange::Renewed;
        }
        self.reset(true);
        self.principal = Some(subject.to_string());
        info!(session = self.session, "plan lifecycle session started");
        SessionChange::Started
    }

    /// Sign-out: nothing to wait for, so loading ends immediately with no status.
    pub fn end_session(&mut self) -> SessionChange {
        self.reset(false);
        info!(session = self.session, "plan lifecycle session ended");
        SessionChange::Ended
    }

    fn reset(&mut self, authenticated: bool) {
        self.session += 1;
        self.principal = None;
        self.plan_seq = 0;
        self.profile_seq = 0;
        self.profile_status_at = 0;
        self.profile_resolved = !authenticated;
        self.plan_resolved = !authenticated;
        self.refresh_pending = false;
        self.state = LifecycleState {
            authenticated,
            ..LifecycleState::initial()
        };
        self.recompute_loading();
    }

    /// Take a ticket for a read that is about to be issued.
    pub fn issue(&mut self) -> ReadTicket {
        ReadTicket {
            seq: self.stamp(),
            session: self.session,
        }
    }

    fn stamp(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Re-issue a ticket within the same session, ordering it after every read issued so far.
    pub fn reissue(&mut self, ticket: ReadTicket) -> ReadTicket {
        let fresh = self.issue();
        ReadTicket {
            seq: fresh.seq,
            session: ticket.session,
        }
    }

    /// A user-initiated status refresh shows loading until source B answers.
    pub fn show_loading(&mut self) {
        self.refresh_pending = true;
        self.recompute_loading();
    }

    /// Source B was skipped because there is no session.
    pub fn skip_unauthenticated(&mut self) {
        self.profile_resolved = true;
        self.plan_resolved = true;
        self.refresh_pending = false;
        self.recompute_loading();
    }

    pub fn apply_profile(&mut self, ticket: ReadTicket, profile: Option<ProfileSnapshot>) -> Adoption {
        if !self.is_current(ticket) {
            return Adoption::Irrelevant;
        }
        self.profile_resolved = true;
        let adoption = self.merge_profile(ticket, profile);
        self.recompute_loading();
        adoption
    }

    fn merge_profile(&mut self, ticket: ReadTicket, profile: Option<ProfileSnapshot>) -> Adoption {
        let Some(profile) = profile else {
            return Adoption::Unchanged;
        };
        if ticket.seq < self.profile_seq {
            debug!(seq = ticket.seq, "dropping out-of-order profile snapshot");
            return Adoption::Stale;
        }
        self.profile_seq = ticket.seq;
        self.state.onboarding_completed = Some(profile.onboarding_completed);

        let Some(status) = profile.plan_status else {
            return Adoption::Unchanged;
        };
        if self.state.plan_status == Some(status) {
            return Adoption::Unchanged;
        }
        info!(%status, seq = ticket.seq, source = "profile", "adopted plan status");
        self.state.plan_status = Some(status);
        self.profile_status_at = self.stamp();
        Adoption::Adopted
    }

    /// Profile read failed: keep the previous snapshot, but it still counts as an answer.
    pub fn profile_failed(&mut self, ticket: ReadTicket) -> Adoption {
        if !self.is_current(ticket) {
            return Adoption::Irrelevant;
        }
        self.profile_resolved = true;
        self.recompute_loading();
        Adoption::Unchanged
    }

    pub fn apply_plan_status(&mut self, ticket: ReadTicket, record: PlanStatusRecord) -> Adoption {
        if !self.is_current(ticket) {
            return Adoption::Irrelevant;
        }
        self.plan_resolved = true;
        self.refresh_pending = false;
        let adoption = self.merge_plan_status(ticket, record);
        self.recompute_loading();
        adoption
    }

    fn merge_plan_status(&mut self, ticket: ReadTicket, record: PlanStatusRecord) -> Adoption {
        if ticket.seq < self.plan_seq {
            debug!(
                seq = ticket.seq,
                plan_seq = self.plan_seq,
                status = %record.status,
                "discarding out-of-order plan status"
            );
            return Adoption::Stale;
        }
        self.plan_seq = ticket.seq;
        self.adopt_version(record.version, record.updated_at);

        if self.state.plan_status == Some(record.status) {
            return Adoption::Unchanged;
        }
        if ticket.seq < self.profile_status_at {
            debug!(
                seq = ticket.seq,
                profile_status_at = self.profile_status_at,
                status = %record.status,
                "profile reported a status while this read was in flight; keeping it"
            );
            return Adoption::Stale;
        }
        info!(
            status = %record.status,
            version = ?record.version,
            seq = ticket.seq,
            source = "plan_status",
            "adopted plan status"
        );
        self.state.plan_status = Some(record.status);
        Adoption::Adopted
    }

    fn adopt_version(&mut self, version: Option<i64>, updated_at: Option<chrono::DateTime<chrono::Utc>>) {
        self.state.plan_version = version;
        self.state.updated_at = updated_at;
        // The first version seen in a session is the baseline, not an update.
        if self.state.acknowledged_version.is_none() {
            self.state.acknowledged_version = version;
        }
    }

    /// Plan status read failed: state untouched except loading.
    pub fn plan_status_failed(&mut self, ticket: ReadTicket) -> Adoption {
        if !self.is_current(ticket) {
            return Adoption::Irrelevant;
        }
        self.plan_resolved = true;
        self.refresh_pending = false;
        self.recompute_loading();
        Adoption::Unchanged
    }

    /// Set by the review screen's leave action only. Returns whether the flag changed.
    pub(crate) fn mark_pending_approval_seen(&mut self) -> bool {
        if !self.state.authenticated || self.state.has_seen_pending_approval {
            return false;
        }
        self.state.has_seen_pending_approval = true;
        true
    }

    /// Record that the user has seen the current plan version.
    pub fn acknowledge_plan_update(&mut self) -> bool {
        if !self.state.has_unseen_plan_update() {
            return false;
        }
        self.state.acknowledged_version = self.state.plan_version;
        true
    }

    fn is_current(&self, ticket: ReadTicket) -> bool {
        if ticket.session != self.session {
            debug!(
                seq = ticket.seq,
                ticket_session = ticket.session,
                session = self.session,
                "ignoring read from an ended session"
            );
            return false;
        }
        true
    }

    fn recompute_loading(&mut self) {
        self.state.is_loading =
            !(self.profile_resolved && self.plan_resolved) || self.refresh_pending;
    }
}
