use async_trait::async_trait;
use coachline_core::error::ApiError;
use coachline_core::plan::PlanStatusRecord;
use coachline_core::profile::{OnboardingSubmission, ProfileSnapshot};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::SourceError;
use crate::sources::{IdentityService, PlanStatusService};

pub const PROFILE_PATH: &str = "/v1/users/me";
pub const ONBOARDING_PATH: &str = "/v1/users/me/onboarding";
pub const PLAN_STATUS_PATH: &str = "/v1/plans/current/status";
pub const HEALTH_PATH: &str = "/health";

/// Coachline API client backing both status sources.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: Url::parse(&config.api_url)?,
            token: config.api_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        Ok(self.base_url.join(path)?)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let req = self.client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// GET a resource, mapping 404 to `None`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, SourceError> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let resp = self.request(reqwest::Method::GET, url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        interpret(status, &body)
    }

    /// Unauthenticated health check. Returns the raw JSON body.
    pub async fn health(&self) -> Result<serde_json::Value, SourceError> {
        let url = self.endpoint(HEALTH_PATH)?;
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        interpret(status, &body)?.ok_or(SourceError::Status {
            status: StatusCode::NOT_FOUND.as_u16(),
            body: None,
        })
    }
}

/// Decode a response body: success → `Some`, 404 → `None`, anything else → error
/// carrying the structured API error when the body has one.
fn interpret<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<Option<T>, SourceError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(SourceError::Status {
            status: status.as_u16(),
            body: serde_json::from_slice::<ApiError>(body).ok(),
        });
    }
    Ok(Some(serde_json::from_slice(body)?))
}

#[async_trait]
impl IdentityService for HttpBackend {
    async fn fetch_profile(&self) -> Result<Option<ProfileSnapshot>, SourceError> {
        self.get_optional(PROFILE_PATH).await
    }

    async fn save_onboarding(
        &self,
        submission: &OnboardingSubmission,
    ) -> Result<ProfileSnapshot, SourceError> {
        let url = self.endpoint(ONBOARDING_PATH)?;
        debug!(%url, "POST");
        let resp = self
            .request(reqwest::Method::POST, url)
            .json(submission)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        // The profile must exist once we can write to it; 404 is a real failure here.
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: serde_json::from_slice::<ApiError>(&body).ok(),
            });
        }
        interpret(status, &body)?.ok_or(SourceError::Status {
            status: status.as_u16(),
            body: None,
        })
    }
}

#[async_trait]
impl PlanStatusService for HttpBackend {
    async fn fetch_plan_status(&self) -> Result<Option<PlanStatusRecord>, SourceError> {
        self.get_optional(PLAN_STATUS_PATH).await
    }
}
