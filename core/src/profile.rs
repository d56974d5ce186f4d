use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plan::PlanStatus;

/// Cached user profile owned by the identity subsystem.
/// `plan_status` is a denormalized copy kept next to the identity session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    pub id: Uuid,
    #[serde(default)]
    pub onboarding_completed: bool,
    /// Absent for accounts that never finished onboarding.
    #[serde(default)]
    pub plan_status: Option<PlanStatus>,
}

/// Answers collected by the onboarding flow. The payload is free-form;
/// the identity service validates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingSubmission {
    pub answers: serde_json::Value,
}
