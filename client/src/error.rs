use coachline_core::error::{ApiError, codes};
use thiserror::Error;

/// Failure reading or writing one of the external status sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),
    #[error(
        "API returned HTTP {status}{}",
        .body.as_ref().map(|b| format!(": {} ({})", b.message, b.error)).unwrap_or_default()
    )]
    Status { status: u16, body: Option<ApiError> },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SourceError {
    /// The backend answered with a conflict, e.g. onboarding already saved.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Status { status, body } => {
                *status == 409 || body.as_ref().is_some_and(|b| b.is(codes::CONFLICT))
            }
            _ => false,
        }
    }

    /// The credentials were missing, expired or rejected.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Status { status, body } => {
                *status == 401 || body.as_ref().is_some_and(|b| b.is(codes::UNAUTHORIZED))
            }
            _ => false,
        }
    }

    /// Suggested CLI exit code, matching the HTTP class of the failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Status { status, .. } if (400..500).contains(status) => 1,
            Self::Status { .. } | Self::Decode(_) => 2,
            Self::Transport(_) => 3,
            Self::Url(_) => 4,
        }
    }
}

/// Errors surfaced to callers of the lifecycle engine.
///
/// Not-found, transient read failures and dropped duplicate refreshes are absorbed
/// inside the engine. Only caller-initiated writes report back.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("an onboarding submission is already in flight")]
    WriteInFlight,
    #[error("an explicit identity operation is already in progress")]
    OperationInProgress,
    #[error("no authenticated session")]
    NotAuthenticated,
    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}
