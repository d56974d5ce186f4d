use std::sync::Arc;

use coachline_client::http::HttpBackend;
use coachline_client::{
    ClientConfig, IdentityService, PlanLifecycle, PlanStatusService, Principal, SessionEvent,
};
use coachline_core::plan::PlanStatusRecord;
use coachline_core::profile::OnboardingSubmission;
use serde_json::json;

use crate::util::{
    EXIT_CLIENT_ERROR, exit_error, print_json, read_json_from_file, report_engine_error,
    report_source_error,
};

/// Subject used for the CLI's own session; the API identifies the user by token.
pub const CLI_SUBJECT: &str = "coachline-cli";

fn connect(config: &ClientConfig) -> Result<Arc<HttpBackend>, i32> {
    HttpBackend::new(config)
        .map(Arc::new)
        .map_err(|e| report_source_error(&e))
}

/// One-shot read of the plan status endpoint. A missing plan prints `NO_PLAN`.
pub async fn status(config: &ClientConfig) -> i32 {
    let backend = match connect(config) {
        Ok(b) => b,
        Err(code) => return code,
    };
    match backend.fetch_plan_status().await {
        Ok(record) => print_json(&record.unwrap_or_else(PlanStatusRecord::no_plan)),
        Err(e) => report_source_error(&e),
    }
}

pub async fn profile(config: &ClientConfig) -> i32 {
    let backend = match connect(config) {
        Ok(b) => b,
        Err(code) => return code,
    };
    match backend.fetch_profile().await {
        Ok(Some(profile)) => print_json(&profile),
        Ok(None) => {
            let err = json!({
                "error": "not_found",
                "message": "No profile exists for the authenticated user"
            });
            eprintln!("{err}");
            EXIT_CLIENT_ERROR
        }
        Err(e) => report_source_error(&e),
    }
}

/// Sign in, save onboarding answers through the engine, print the resulting state.
pub async fn onboard(config: &ClientConfig, answers_path: &str) -> i32 {
    let answers = read_json_from_file(answers_path).unwrap_or_else(|e| exit_error(&e, None));
    if !answers.is_object() {
        exit_error(
            "Onboarding answers must be a JSON object",
            Some("Example: {\"goal\": \"strength\", \"days_per_week\": 4}"),
        );
    }

    let backend = match connect(config) {
        Ok(b) => b,
        Err(code) => return code,
    };
    let lifecycle = PlanLifecycle::new(backend.clone(), backend, config.poll);

    let code = match lifecycle.begin_identity_operation() {
        Ok(operation) => {
            operation
                .complete(SessionEvent::SignedIn(Principal::new(CLI_SUBJECT)))
                .await;
            match lifecycle.submit_onboarding(&OnboardingSubmission { answers }).await {
                Ok(state) => print_json(&state),
                Err(e) => report_engine_error(&e),
            }
        }
        Err(e) => report_engine_error(&e),
    };
    lifecycle.shutdown();
    code
}
