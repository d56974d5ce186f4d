use std::sync::Arc;

use clap::Args;
use coachline_client::http::HttpBackend;
use coachline_client::{
    ClientConfig, LifecycleState, PlanLifecycle, Principal, Redirect, RouteSegment, SessionEvent,
};
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::commands::plan::CLI_SUBJECT;
use crate::util::{EXIT_OK, print_line, report_source_error};

#[derive(Args)]
pub struct WatchArgs {
    /// Router path to start on
    #[arg(long, default_value = "/(tabs)")]
    route: String,
    /// Leave the review screen right after being sent there
    #[arg(long)]
    leave_review: bool,
    /// Acknowledge plan version updates as soon as they are reported
    #[arg(long)]
    ack_updates: bool,
}

fn state_line(state: &LifecycleState) -> serde_json::Value {
    json!({
        "event": "state",
        "state": state,
        "has_unseen_plan_update": state.has_unseen_plan_update(),
    })
}

fn redirect_line(redirect: Redirect) -> serde_json::Value {
    json!({
        "event": "redirect",
        "target": redirect,
        "path": redirect.path(),
    })
}

/// Runs until Ctrl-C. The route channel plays the router: every redirect is
/// performed by moving it to the target segment.
pub async fn run(config: &ClientConfig, args: WatchArgs) -> i32 {
    let backend = match HttpBackend::new(config) {
        Ok(b) => Arc::new(b),
        Err(e) => return report_source_error(&e),
    };
    let lifecycle = PlanLifecycle::new(backend.clone(), backend, config.poll);

    let (route_tx, route_rx) = watch::channel(RouteSegment::from_path(&args.route));
    let mut guard = lifecycle.guard_driver(route_rx);
    let mut states = lifecycle.subscribe();

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let listener = lifecycle.spawn_session_listener(events_rx);
    let _ = events_tx.send(SessionEvent::SignedIn(Principal::new(CLI_SUBJECT)));

    print_line(&state_line(&states.borrow_and_update()));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                print_line(&state_line(&state));
                if args.ack_updates && state.has_unseen_plan_update() && lifecycle.acknowledge_plan_update() {
                    print_line(&json!({ "event": "plan_update_acknowledged", "version": state.plan_version }));
                }
            }
            redirect = guard.next_redirect() => {
                let Some(redirect) = redirect else {
                    break;
                };
                print_line(&redirect_line(redirect));
                route_tx.send_replace(redirect.segment());
                if args.leave_review && redirect == Redirect::Review {
                    let seen = lifecycle.review_screen().leave();
                    route_tx.send_replace(Redirect::Home.segment());
                    print_line(&json!({ "event": "review_left", "first_visit": seen }));
                }
            }
        }
    }

    info!("stopping plan lifecycle watch");
    drop(events_tx);
    listener.abort();
    lifecycle.shutdown();
    print_line(&state_line(&lifecycle.state()));
    EXIT_OK
}

#[cfg(test)]
mod tests {
    use coachline_client::{LifecycleState, Redirect};

    use super::{redirect_line, state_line};

    #[test]
    fn redirect_line_carries_path() {
        let line = redirect_line(Redirect::Review);
        assert_eq!(line["event"], "redirect");
        assert_eq!(line["target"], "review");
        assert_eq!(line["path"], "/plan/review");
    }

    #[test]
    fn state_line_reports_loading_initially() {
        let line = state_line(&LifecycleState::initial());
        assert_eq!(line["event"], "state");
        assert_eq!(line["state"]["isLoading"], true);
        assert_eq!(line["has_unseen_plan_update"], false);
    }
}
