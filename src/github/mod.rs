//! HTTP implementation of the provisioning capability.
//!
//! Talks to the GitHub internal Codespaces endpoints for one repository.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use crate::client::{ClientFuture, CreatedJob, JobStatus, ProvisioningClient, ProvisioningError};
use crate::request::CreationRequest;

const ACCEPT_HEADER: &str = "application/vnd.github+json";
const USER_AGENT_HEADER: &str = concat!("prebuild-cache/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`GitHubClient`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GitHubClientConfig {
    /// API base URL, without a trailing slash.
    pub api_url: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repository: String,
    /// Token sent as a bearer credential.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Provisioning client backed by the GitHub REST API.
#[derive(Clone, Debug)]
pub struct GitHubClient {
    http: Client,
    base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    job_status_id: JobId,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JobId {
    Text(String),
    Number(u64),
}

impl JobId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    documentation_url: Option<String>,
}

impl GitHubClient {
    /// Builds a client scoped to one repository.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::Transport`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: &GitHubClientConfig) -> Result<Self, ProvisioningError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_HEADER));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| ProvisioningError::Transport {
                message: format!("failed to build HTTP client: {err}"),
            })?;

        Ok(Self {
            http,
            base: format!(
                "{}/vscs_internal/codespaces/repository/{}/{}",
                config.api_url.trim_end_matches('/'),
                config.owner,
                config.repository
            ),
            token: config.token.clone(),
        })
    }

    fn create_url(&self) -> String {
        format!("{}/prebuild/templates", self.base)
    }

    fn status_url(&self, job_id: &str) -> String {
        format!(
            "{}/prebuild_templates/provisioning_statuses/{job_id}",
            self.base
        )
    }

    fn logs_url(&self, guid: &str) -> String {
        format!("{}/prebuilds/environments/{guid}/logs", self.base)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, ProvisioningError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| ProvisioningError::Transport {
                message: err.to_string(),
            })?;
        read_body(response).await
    }
}

async fn read_body(response: Response) -> Result<String, ProvisioningError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ProvisioningError::Transport {
            message: err.to_string(),
        })?;

    if status.is_success() {
        return Ok(body);
    }

    Err(api_error(status.as_u16(), &body))
}

fn api_error(status: u16, body: &str) -> ProvisioningError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => ProvisioningError::Api {
            status,
            message: parsed.message,
            documentation_url: parsed.documentation_url,
        },
        Err(_) if !body.trim().is_empty() => ProvisioningError::Api {
            status,
            message: body.trim().to_owned(),
            documentation_url: None,
        },
        Err(_) => ProvisioningError::Api {
            status,
            message: format!("HTTP {status}"),
            documentation_url: None,
        },
    }
}

fn decode<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, ProvisioningError> {
    serde_json::from_str(body).map_err(|err| ProvisioningError::Decode {
        message: err.to_string(),
    })
}

impl ProvisioningClient for GitHubClient {
    fn create_job<'a>(&'a self, request: &'a CreationRequest) -> ClientFuture<'a, CreatedJob> {
        Box::pin(async move {
            debug!(location = %request.location, "POST prebuild template");
            let body = self
                .send(self.http.post(self.create_url()).json(request))
                .await?;
            let parsed: CreateResponse = decode(&body)?;
            Ok(CreatedJob {
                job_id: parsed.job_status_id.into_string(),
                raw: body,
            })
        })
    }

    fn job_status<'a>(&'a self, job_id: &'a str) -> ClientFuture<'a, JobStatus> {
        Box::pin(async move {
            debug!(job_id, "GET provisioning status");
            let body = self.send(self.http.get(self.status_url(job_id))).await?;
            decode(&body)
        })
    }

    fn fetch_logs<'a>(&'a self, guid: &'a str) -> ClientFuture<'a, String> {
        Box::pin(async move {
            debug!(guid, "GET prebuild environment logs");
            self.send(self.http.get(self.logs_url(guid))).await
        })
    }
}
