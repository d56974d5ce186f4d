//! Plan-lifecycle synchronization and navigation-guard engine.
//!
//! Tracks where the user's generated training plan stands by reconciling the
//! identity profile snapshot with the plan status endpoint, polls while the
//! status is transient, and decides which screen the router must show.

pub mod config;
pub mod engine;
pub mod error;
mod flight;
pub mod guard;
pub mod http;
pub mod identity;
pub mod poller;
pub mod reconciler;
pub mod review;
pub mod sources;
pub mod state;

#[cfg(test)]
mod testing;

pub use config::{ClientConfig, PollIntervals};
pub use engine::{PlanLifecycle, RefreshOutcome};
pub use error::{ConfigError, EngineError, SourceError};
pub use guard::{GuardDriver, GuardInput, Redirect, RouteSegment, ScreenAccess, decide};
pub use identity::{IdentityOperation, Principal, SessionEvent};
pub use review::ReviewScreen;
pub use sources::{IdentityService, PlanStatusService};
pub use state::LifecycleState;
