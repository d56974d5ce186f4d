use clap::Args;
use coachline_client::{GuardInput, RouteSegment, decide};
use coachline_core::plan::PlanStatus;
use serde_json::json;

use crate::util::{exit_error, print_json};

#[derive(Args)]
pub struct GuardArgs {
    /// Plan status (NO_PLAN, GENERATING, PENDING_APPROVAL, ACTIVE); omit for undetermined
    #[arg(long)]
    status: Option<String>,
    /// Current router path (e.g. "/(tabs)", "/plan/review")
    #[arg(long, default_value = "/")]
    route: String,
    /// Lifecycle is still loading
    #[arg(long)]
    loading: bool,
    /// The review screen has already been left once this session
    #[arg(long)]
    seen_review: bool,
    /// The profile reports onboarding as completed
    #[arg(long)]
    onboarding_completed: bool,
}

impl GuardArgs {
    fn input(&self) -> Result<GuardInput, String> {
        let plan_status = self
            .status
            .as_deref()
            .map(str::parse::<PlanStatus>)
            .transpose()?;
        Ok(GuardInput {
            plan_status,
            is_loading: self.loading,
            segment: RouteSegment::from_path(&self.route),
            has_seen_pending_approval: self.seen_review,
            onboarding_completed: self.onboarding_completed,
        })
    }
}

fn decision(input: &GuardInput) -> serde_json::Value {
    let redirect = decide(input);
    json!({
        "segment": input.segment,
        "plan_status": input.plan_status,
        "redirect": redirect,
        "redirect_path": redirect.map(|r| r.path()),
    })
}

pub fn run(args: GuardArgs) -> i32 {
    let input = args.input().unwrap_or_else(|e| {
        exit_error(
            &e,
            Some("Valid statuses: NO_PLAN, GENERATING, PENDING_APPROVAL, ACTIVE"),
        )
    });
    print_json(&decision(&input))
}
