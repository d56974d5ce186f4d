use std::time::Duration;

use coachline_core::plan::PlanStatus;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_GENERATING_POLL_MS: u64 = 3_000;
pub const DEFAULT_PENDING_APPROVAL_POLL_MS: u64 = 15_000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// How often the poller re-reads the sources while a status is transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub generating: Duration,
    pub pending_approval: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            generating: Duration::from_millis(DEFAULT_GENERATING_POLL_MS),
            pending_approval: Duration::from_millis(DEFAULT_PENDING_APPROVAL_POLL_MS),
        }
    }
}

impl PollIntervals {
    /// Polling interval for a status, `None` when the status is not polled.
    pub fn for_status(&self, status: PlanStatus) -> Option<Duration> {
        match status {
            PlanStatus::Generating => Some(self.generating),
            PlanStatus::PendingApproval => Some(self.pending_approval),
            PlanStatus::NoPlan | PlanStatus::Active => None,
        }
    }
}

/// Client configuration for talking to the Coachline API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub poll: PollIntervals,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_token,
            request_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            poll: PollIntervals::default(),
        }
    }

    /// Apply `COACHLINE_POLL_GENERATING_MS`, `COACHLINE_POLL_PENDING_APPROVAL_MS`
    /// and `COACHLINE_HTTP_TIMEOUT_SECS` from the environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parse_positive(
            "COACHLINE_POLL_GENERATING_MS",
            lookup("COACHLINE_POLL_GENERATING_MS"),
        )? {
            self.poll.generating = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_positive(
            "COACHLINE_POLL_PENDING_APPROVAL_MS",
            lookup("COACHLINE_POLL_PENDING_APPROVAL_MS"),
        )? {
            self.poll.pending_approval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_positive(
            "COACHLINE_HTTP_TIMEOUT_SECS",
            lookup("COACHLINE_HTTP_TIMEOUT_SECS"),
        )? {
            self.request_timeout = Duration::from_secs(secs);
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Empty {
                name: "COACHLINE_API_URL",
            });
        }
        Ok(self)
    }
}

fn parse_positive(name: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::InvalidNumber { name, value: raw }),
    }
}
