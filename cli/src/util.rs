use std::path::PathBuf;

use coachline_client::{ClientConfig, EngineError, SourceError};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Stored credentials for the CLI
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub api_url: String,
    pub access_token: String,
}

/// Exit codes: 0=success, 1=client error (4xx), 2=server error (5xx),
///             3=connection error, 4=usage error
pub const EXIT_OK: i32 = 0;
pub const EXIT_CLIENT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 4;

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", pretty(&err));
    std::process::exit(EXIT_USAGE);
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Print a successful result to stdout.
pub fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_value(value) {
        Ok(v) => {
            println!("{}", pretty(&v));
            EXIT_OK
        }
        Err(e) => exit_error(&format!("Failed to serialize output: {e}"), None),
    }
}

/// Print one compact JSON document per line, for streaming output.
pub fn print_line(value: &serde_json::Value) {
    println!("{value}");
}

fn recovery_hint(err: &SourceError) -> Option<&'static str> {
    if err.is_unauthorized() {
        Some("Check --api-key / COACHLINE_API_KEY or the token in the stored credentials.")
    } else if err.is_conflict() {
        Some("The server already holds this write. Run 'coachline plan profile' to see it.")
    } else {
        None
    }
}

/// Structured stderr body for a source failure.
pub fn source_error_body(err: &SourceError) -> serde_json::Value {
    let mut out = match err {
        SourceError::Status {
            status,
            body: Some(body),
        } => {
            let mut out = json!(body);
            out["status"] = json!(status);
            out
        }
        SourceError::Status { status, body: None } => json!({
            "error": "http_error",
            "status": status,
            "message": err.to_string()
        }),
        SourceError::Transport(_) => json!({
            "error": "connection_error",
            "message": err.to_string(),
            "docs_hint": "Is the API server running? Check COACHLINE_API_URL."
        }),
        SourceError::Url(_) => json!({
            "error": "cli_error",
            "message": err.to_string(),
            "docs_hint": "COACHLINE_API_URL must be an absolute URL."
        }),
        SourceError::Decode(_) => json!({
            "error": "decode_error",
            "message": err.to_string()
        }),
    };
    if let Some(hint) = recovery_hint(err).filter(|_| out.get("docs_hint").is_none()) {
        out["docs_hint"] = json!(hint);
    }
    out
}

pub fn report_source_error(err: &SourceError) -> i32 {
    eprintln!("{}", pretty(&source_error_body(err)));
    err.exit_code()
}

pub fn report_engine_error(err: &EngineError) -> i32 {
    match err {
        EngineError::Source(source) => report_source_error(source),
        other => {
            let body = json!({
                "error": "engine_error",
                "message": other.to_string()
            });
            eprintln!("{}", pretty(&body));
            EXIT_CLIENT_ERROR
        }
    }
}

pub fn config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coachline");
    config_dir.join("config.json")
}

pub fn load_credentials() -> Option<StoredCredentials> {
    let path = config_path();
    let data = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&data).ok()
}

/// Resolve a Bearer token for API requests (priority order):
/// 1. --api-key / COACHLINE_API_KEY
/// 2. ~/.config/coachline/config.json
/// 3. Error
pub fn resolve_token(api_key: Option<String>) -> Result<String, String> {
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        return Ok(key);
    }
    if let Some(creds) = load_credentials() {
        return Ok(creds.access_token);
    }
    Err("No credentials found. Set COACHLINE_API_KEY or store a token in the config file.".into())
}

/// Client configuration with environment overrides applied. Exits on invalid values.
pub fn client_config(api_url: &str, token: Option<String>) -> ClientConfig {
    ClientConfig::new(api_url, token)
        .with_env_overrides()
        .unwrap_or_else(|e| exit_error(&e.to_string(), Some("Check the COACHLINE_* environment variables.")))
}

/// Like [`client_config`], but requires a token.
pub fn authed_config(api_url: &str, api_key: Option<String>) -> ClientConfig {
    match resolve_token(api_key) {
        Ok(token) => client_config(api_url, Some(token)),
        Err(message) => exit_error(
            &message,
            Some(&format!("Credentials file: {}", config_path().to_string_lossy())),
        ),
    }
}

/// Read JSON from a file path or stdin (when path is "-").
pub fn read_json_from_file(path: &str) -> Result<serde_json::Value, String> {
    let raw = if path == "-" {
        std::io::read_to_string(std::io::stdin())
            .map_err(|e| format!("Failed to read stdin: {e}"))?
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))?
    };
    serde_json::from_str(&raw).map_err(|e| format!("Invalid JSON in '{path}': {e}"))
}
