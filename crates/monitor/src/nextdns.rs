//! HTTP adapter for the filtering-service API: denylist fetch, log fetch,
//! and API-key validation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

use denywatch_domain::model::{ApiCredential, LogEntry, ProfileId};
use denywatch_domain::sources::{DenylistSource, FetchError, LogSource};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const LOG_FETCH_LIMIT: u32 = 100;
const API_KEY_HEADER: &str = "X-Api-Key";

/// Thin client over the filtering-service REST API. Implements both fetch
/// traits the monitor engine consumes.
pub struct NextDnsClient {
    http: reqwest::Client,
    base_url: String,
}

/// Profile id + name pair returned by API-key validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProfilesResponse {
    #[serde(default)]
    data: Vec<ProfileSummary>,
}

/// Denylist entries carry the domain in `id` on current API versions, with
/// `domain`/`name` seen on older payloads.
#[derive(Debug, Default, Deserialize)]
struct DenylistRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl DenylistRecord {
    fn into_domain(self) -> Option<String> {
        self.id
            .or(self.domain)
            .or(self.name)
            .filter(|domain| !domain.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
struct DenylistResponse {
    #[serde(default)]
    data: Vec<DenylistRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct LogsResponse {
    #[serde(default)]
    data: Vec<LogEntry>,
}

fn transport(err: reqwest::Error) -> FetchError {
    FetchError::Transport(err.to_string())
}

impl NextDnsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(transport)?;
        let base: String = base_url.into();
        Ok(Self {
            http,
            base_url: base.trim_end_matches('/').to_string(),
        })
    }

    /// Validates an API key by listing its profiles; returns the first one.
    pub async fn validate_api_key(
        &self,
        credential: &ApiCredential,
    ) -> Result<ProfileSummary, FetchError> {
        let url = format!("{}/profiles", self.base_url);
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body: ProfilesResponse = response
            .json()
            .await
            .map_err(|err| FetchError::Malformed(err.to_string()))?;
        body.data
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Malformed("no profiles for api key".to_string()))
    }
}

#[async_trait]
impl DenylistSource for NextDnsClient {
    async fn fetch_denylist(
        &self,
        profile: &ProfileId,
        credential: &ApiCredential,
    ) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/profiles/{}/denylist", self.base_url, profile);
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        // A denylist that fails to decode is a failed fetch, not an empty
        // denylist: the caller keeps its stale cached set.
        let body: DenylistResponse = response
            .json()
            .await
            .map_err(|err| FetchError::Malformed(err.to_string()))?;
        Ok(body
            .data
            .into_iter()
            .filter_map(DenylistRecord::into_domain)
            .collect())
    }
}

#[async_trait]
impl LogSource for NextDnsClient {
    async fn fetch_logs(
        &self,
        profile: &ProfileId,
        credential: &ApiCredential,
        window: Duration,
    ) -> Result<Vec<LogEntry>, FetchError> {
        let from_ms = Utc::now().timestamp_millis() - window.as_millis() as i64;
        let url = format!("{}/profiles/{}/logs", self.base_url, profile);
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, credential.expose())
            .query(&[
                ("limit", LOG_FETCH_LIMIT.to_string()),
                ("from", from_ms.to_string()),
            ])
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        // A malformed log payload degrades to an empty batch for this poll.
        match response.json::<LogsResponse>().await {
            Ok(body) => Ok(body.data),
            Err(err) => {
                warn!(profile = %profile, %err, "malformed log payload, treating as empty");
                Ok(Vec::new())
            }
        }
    }
}
