use chrono::{DateTime, Utc};
use coachline_core::plan::PlanStatus;
use serde::Serialize;

/// Reactive lifecycle value published to the routing and rendering layer.
///
/// `plan_status == None` means "not determined yet" and is never the same as
/// [`PlanStatus::NoPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleState {
    pub plan_status: Option<PlanStatus>,
    pub plan_version: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_loading: bool,
    pub has_seen_pending_approval: bool,
    /// False both before the first session event and after sign-out.
    pub authenticated: bool,
    /// From the profile snapshot; `None` until a profile has been read.
    pub onboarding_completed: Option<bool>,
    /// Plan version the user has already been told about.
    pub acknowledged_version: Option<i64>,
}

impl LifecycleState {
    pub fn initial() -> Self {
        Self {
            plan_status: None,
            plan_version: None,
            updated_at: None,
            is_loading: true,
            has_seen_pending_approval: false,
            authenticated: false,
            onboarding_completed: None,
            acknowledged_version: None,
        }
    }

    /// Resolved means the guard may act on the status.
    pub fn is_resolved(&self) -> bool {
        !self.is_loading && self.plan_status.is_some()
    }

    /// A live plan was replaced by a newer version the user has not acknowledged.
    pub fn has_unseen_plan_update(&self) -> bool {
        self.plan_status == Some(PlanStatus::Active)
            && match (self.plan_version, self.acknowledged_version) {
                (Some(current), Some(seen)) => current > seen,
                _ => false,
            }
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::initial()
    }
}
