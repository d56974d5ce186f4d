//! Navigation guard: maps the lifecycle state and the current route to the
//! redirect the router must perform, if any.
//!
//! [`decide`] is pure. [`GuardDriver`] is the single global guard that owns
//! redirect side effects; screens use [`screen_access`], which never redirects.

use coachline_core::plan::PlanStatus;
use serde::Serialize;
use tokio::sync::watch;

use crate::state::LifecycleState;

/// Top-level route segment the user is currently on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSegment {
    Auth,
    Onboarding,
    Generating,
    Review,
    Home,
    Other(String),
}

impl RouteSegment {
    /// Map a router path to its segment. Group markers like `(auth)` are accepted.
    pub fn from_path(path: &str) -> Self {
        let mut parts = path
            .split('/')
            .map(|part| part.trim_start_matches('(').trim_end_matches(')'))
            .filter(|part| !part.is_empty());
        let Some(first) = parts.next() else {
            return Self::Home;
        };
        match first {
            "auth" | "login" | "sign-in" | "sign-up" => Self::Auth,
            "onboarding" => Self::Onboarding,
            "tabs" | "home" => Self::Home,
            "plan" => match parts.next() {
                Some("generating") => Self::Generating,
                Some("review") => Self::Review,
                _ => Self::Other(path.to_string()),
            },
            _ => Self::Other(path.to_string()),
        }
    }
}

/// Screen the router must navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Redirect {
    Generating,
    Review,
    OnboardingEntry,
    Home,
}

impl Redirect {
    pub fn path(self) -> &'static str {
        match self {
            Self::Generating => "/plan/generating",
            Self::Review => "/plan/review",
            Self::OnboardingEntry => "/onboarding",
            Self::Home => "/(tabs)",
        }
    }

    pub fn segment(self) -> RouteSegment {
        RouteSegment::from_path(self.path())
    }
}

/// Everything the decision depends on. Two equal inputs always yield the same decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardInput {
    pub plan_status: Option<PlanStatus>,
    pub is_loading: bool,
    pub segment: RouteSegment,
    pub has_seen_pending_approval: bool,
    pub onboarding_completed: bool,
}

impl GuardInput {
    pub fn new(state: &LifecycleState, segment: RouteSegment) -> Self {
        Self {
            plan_status: state.plan_status,
            is_loading: state.is_loading,
            segment,
            has_seen_pending_approval: state.has_seen_pending_approval,
            onboarding_completed: state.onboarding_completed.unwrap_or(false),
        }
    }

    /// Auth always shields. Onboarding shields until the profile reports it complete,
    /// which is what hands the user over to the generating screen.
    fn in_entry_flow(&self) -> bool {
        match self.segment {
            RouteSegment::Auth => true,
            RouteSegment::Onboarding => !self.onboarding_completed,
            _ => false,
        }
    }
}

pub fn decide(input: &GuardInput) -> Option<Redirect> {
    if input.is_loading {
        return None;
    }
    let status = input.plan_status?;
    if input.in_entry_flow() {
        return None;
    }

    let target = match status {
        PlanStatus::Generating => Some(Redirect::Generating),
        PlanStatus::PendingApproval if !input.has_seen_pending_approval => Some(Redirect::Review),
        PlanStatus::PendingApproval => None,
        PlanStatus::NoPlan => Some(Redirect::OnboardingEntry),
        PlanStatus::Active => match input.segment {
            RouteSegment::Generating | RouteSegment::Review => Some(Redirect::Home),
            _ => None,
        },
    };
    target.filter(|redirect| redirect.segment() != input.segment)
}

/// Read-only view for a screen that requires a specific status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenAccess {
    pub is_loading: bool,
    pub permitted: bool,
}

pub fn screen_access(state: &LifecycleState, required: PlanStatus) -> ScreenAccess {
    ScreenAccess {
        is_loading: state.is_loading || state.plan_status.is_none(),
        permitted: state.is_resolved() && state.plan_status == Some(required),
    }
}

/// The global guard. Re-evaluates whenever the lifecycle state or the route
/// changes and yields a redirect only for inputs it has not decided before.
pub struct GuardDriver {
    state: watch::Receiver<LifecycleState>,
    route: watch::Receiver<RouteSegment>,
    last: Option<GuardInput>,
}

impl GuardDriver {
    pub fn new(state: watch::Receiver<LifecycleState>, route: watch::Receiver<RouteSegment>) -> Self {
        Self {
            state,
            route,
            last: None,
        }
    }

    /// Decide on the current inputs. `None` if nothing changed or no redirect is needed.
    pub fn evaluate(&mut self) -> Option<Redirect> {
        let state = self.state.borrow_and_update().clone();
        let segment = self.route.borrow_and_update().clone();
        let input = GuardInput::new(&state, segment);
        if self.last.as_ref() == Some(&input) {
            return None;
        }
        let decision = decide(&input);
        self.last = Some(input);
        decision
    }

    /// Wait for the next redirect. Returns `None` once either channel closes.
    pub async fn next_redirect(&mut self) -> Option<Redirect> {
        loop {
            if let Some(redirect) = self.evaluate() {
                tracing::info!(path = redirect.path(), "navigation guard redirect");
                return Some(redirect);
            }
            tokio::select! {
                changed = self.state.changed() => changed.ok()?,
                changed = self.route.changed() => changed.ok()?,
            }
        }
    }
}
