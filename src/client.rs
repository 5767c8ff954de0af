//! Capability interface for the remote provisioning API.
//!
//! The orchestration core only talks to the provisioning service through
//! [`ProvisioningClient`], so tests can drive it with scripted doubles and
//! the binary can plug in the HTTP implementation from [`crate::github`].

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::request::CreationRequest;

/// Future returned by provisioning client operations.
pub type ClientFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProvisioningError>> + Send + 'a>>;

/// Result of a successful creation call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreatedJob {
    /// Identifier used to poll the provisioning status.
    pub job_id: String,
    /// Raw response body as returned by the API.
    pub raw: String,
}

/// Status payload returned by a provisioning status check.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct JobStatus {
    /// Raw state token (for example `processing` or `succeeded`).
    #[serde(alias = "status")]
    pub state: String,
    /// Optional human-readable detail.
    #[serde(default)]
    pub message: Option<String>,
    /// Whether build logs can be fetched for a failed job. Absent or `null`
    /// reads as `false`.
    #[serde(default, deserialize_with = "null_as_false")]
    pub error_logs_available: bool,
    /// Environment identifier used to fetch build logs.
    #[serde(default)]
    pub guid: Option<String>,
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Option::<bool>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl JobStatus {
    /// Convenience constructor for a bare state token.
    #[must_use]
    pub fn with_state(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            ..Self::default()
        }
    }
}

/// Errors raised while talking to the provisioning API.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProvisioningError {
    /// The API answered with a non-success status code.
    #[error("API returned status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error text supplied by the API.
        message: String,
        /// Optional documentation link supplied by the API.
        documentation_url: Option<String>,
    },
    /// The request never produced a response.
    #[error("request failed: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
    /// A success response could not be decoded.
    #[error("unexpected response body: {message}")]
    Decode {
        /// Decoder error text.
        message: String,
    },
}

impl ProvisioningError {
    /// Message suitable for display as a location's diagnostic.
    ///
    /// API errors surface the text the API supplied; other variants fall back
    /// to their full description.
    #[must_use]
    pub fn diagnostic_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Transport { .. } | Self::Decode { .. } => self.to_string(),
        }
    }

    /// Documentation link attached to an API error, if any.
    #[must_use]
    pub fn documentation_url(&self) -> Option<&str> {
        match self {
            Self::Api {
                documentation_url, ..
            } => documentation_url.as_deref(),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }
}

/// Operations the orchestration core needs from the provisioning service.
pub trait ProvisioningClient {
    /// Requests creation of a prebuild template for one location.
    fn create_job<'a>(&'a self, request: &'a CreationRequest) -> ClientFuture<'a, CreatedJob>;

    /// Fetches the provisioning status of a previously created job.
    fn job_status<'a>(&'a self, job_id: &'a str) -> ClientFuture<'a, JobStatus>;

    /// Fetches the build log of a failed prebuild environment.
    fn fetch_logs<'a>(&'a self, guid: &'a str) -> ClientFuture<'a, String>;
}
