use serde_json::json;

use crate::util::{config_path, exit_error, print_json};

pub fn logout() -> i32 {
    let path = config_path();
    let removed = path.exists();
    if removed {
        if let Err(e) = std::fs::remove_file(&path) {
            exit_error(
                &format!("Failed to remove '{}': {e}", path.to_string_lossy()),
                None,
            );
        }
    }
    print_json(&json!({
        "status": "logged_out",
        "removed": removed,
        "config_path": path.to_string_lossy()
    }))
}
