use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the user's generated training plan stands.
///
/// There is no advancement order: a live plan can go back to `Generating`
/// when a new one is requested, so callers must never compare statuses by rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    /// No plan exists. Legacy profiles may still report `INACTIVE`.
    #[serde(alias = "INACTIVE")]
    NoPlan,
    /// The generation job is running.
    Generating,
    /// Generated and waiting for a coach to approve it.
    PendingApproval,
    /// Approved and live.
    Active,
}

impl PlanStatus {
    /// Statuses that are expected to change without user action and are worth polling.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Generating | Self::PendingApproval)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoPlan => "NO_PLAN",
            Self::Generating => "GENERATING",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Active => "ACTIVE",
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NO_PLAN" | "INACTIVE" => Ok(Self::NoPlan),
            "GENERATING" => Ok(Self::Generating),
            "PENDING_APPROVAL" => Ok(Self::PendingApproval),
            "ACTIVE" => Ok(Self::Active),
            other => Err(format!(
                "unknown plan status '{other}' (expected NO_PLAN, GENERATING, PENDING_APPROVAL or ACTIVE)"
            )),
        }
    }
}

/// Authoritative plan status as returned by `GET /v1/plans/current/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStatusRecord {
    pub status: PlanStatus,
    /// Incremented every time a new plan is activated.
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PlanStatusRecord {
    /// Record used when the plan resource does not exist for the user.
    pub fn no_plan() -> Self {
        Self {
            status: PlanStatus::NoPlan,
            version: None,
            updated_at: None,
        }
    }
}
