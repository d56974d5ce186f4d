use async_trait::async_trait;
use coachline_core::plan::PlanStatusRecord;
use coachline_core::profile::{OnboardingSubmission, ProfileSnapshot};

use crate::error::SourceError;

/// Identity subsystem: owns the profile snapshot (source A).
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Current profile, `None` when the account has no profile yet.
    async fn fetch_profile(&self) -> Result<Option<ProfileSnapshot>, SourceError>;

    /// Persist onboarding answers. The returned profile reflects the write,
    /// including the plan status the backend moved to.
    async fn save_onboarding(
        &self,
        submission: &OnboardingSubmission,
    ) -> Result<ProfileSnapshot, SourceError>;
}

/// Plan resource subsystem: the authoritative plan status (source B).
#[async_trait]
pub trait PlanStatusService: Send + Sync {
    /// `None` when the user has no plan resource at all.
    async fn fetch_plan_status(&self) -> Result<Option<PlanStatusRecord>, SourceError>;
}
