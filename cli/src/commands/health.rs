use coachline_client::ClientConfig;
use coachline_client::http::HttpBackend;

use crate::util::{print_json, report_source_error};

pub async fn run(config: &ClientConfig) -> i32 {
    let backend = match HttpBackend::new(config) {
        Ok(backend) => backend,
        Err(e) => return report_source_error(&e),
    };
    match backend.health().await {
        Ok(body) => print_json(&body),
        Err(e) => report_source_error(&e),
    }
}
