//! Resolution of the diagnostic shown for an unsuccessful location.
//!
//! Failed records are resolved through an ordered chain: the API's own
//! message, then the fetched build log, then a generic fallback. The first
//! resolver that yields a diagnostic wins.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::client::{ProvisioningClient, ProvisioningError};
use crate::job::{JobRecord, JobState};

/// Text shown when no specific diagnostic is available.
pub const FALLBACK_MESSAGE: &str =
    "The prebuild failed for an unspecified reason. Retrying the run may help.";

/// Diagnostic resolved for an unsuccessful location.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Diagnostic {
    /// Message supplied by the provisioning API.
    Message {
        /// Message text.
        text: String,
        /// Optional documentation link supplied with the message.
        documentation_url: Option<String>,
    },
    /// Build log fetched for the failed environment.
    BuildLog {
        /// Location the log belongs to.
        location: String,
        /// Environment identifier the log was fetched from.
        guid: String,
        /// Full log text.
        text: String,
    },
    /// Generic fallback when nothing more specific is known.
    Fallback,
    /// The job was still pending when polling stopped.
    TimedOut {
        /// Status checks issued before giving up.
        attempts: u32,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message {
                text,
                documentation_url: Some(url),
            } => write!(f, "{text} (see {url})"),
            Self::Message { text, .. } => f.write_str(text),
            Self::BuildLog {
                location,
                guid,
                text,
            } => write!(f, "Build log for {location} (environment {guid}):\n{text}"),
            Self::Fallback => f.write_str(FALLBACK_MESSAGE),
            Self::TimedOut { attempts } => write!(
                f,
                "The prebuild was still in progress after {attempts} status checks."
            ),
        }
    }
}

type LogFetch = Result<String, ProvisioningError>;

/// Resolves diagnostics for unsuccessful records.
///
/// Build log fetches are memoised per environment, so resolving the same
/// record repeatedly issues at most one fetch.
#[derive(Debug)]
pub struct ErrorResolver<'a, C> {
    client: &'a C,
    fetched: HashMap<String, LogFetch>,
}

impl<'a, C: ProvisioningClient> ErrorResolver<'a, C> {
    /// Creates a resolver that fetches logs through `client`.
    #[must_use]
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            fetched: HashMap::new(),
        }
    }

    /// Resolves the diagnostic for a record.
    ///
    /// Returns `None` for records that succeeded or never left creation.
    pub async fn resolve(&mut self, record: &JobRecord) -> Option<Diagnostic> {
        match record.state {
            JobState::Failed | JobState::CreationFailed => Some(self.resolve_failure(record).await),
            JobState::TimedOut => Some(Diagnostic::TimedOut {
                attempts: record.attempts,
            }),
            JobState::Creating | JobState::Pending | JobState::Succeeded => None,
        }
    }

    async fn resolve_failure(&mut self, record: &JobRecord) -> Diagnostic {
        if let Some(diagnostic) = message_diagnostic(record) {
            return diagnostic;
        }
        if let Some(diagnostic) = self.build_log_diagnostic(record).await {
            return diagnostic;
        }
        Diagnostic::Fallback
    }

    async fn build_log_diagnostic(&mut self, record: &JobRecord) -> Option<Diagnostic> {
        if !record.error_logs_available {
            return None;
        }
        let guid = record.guid.as_deref()?;

        if !self.fetched.contains_key(guid) {
            debug!(location = %record.location, guid, "fetching build log");
            let fetched = self.client.fetch_logs(guid).await;
            self.fetched.insert(guid.to_owned(), fetched);
        }

        match self.fetched.get(guid)? {
            Ok(text) => Some(Diagnostic::BuildLog {
                location: record.location.clone(),
                guid: guid.to_owned(),
                text: text.clone(),
            }),
            Err(err) => {
                warn!(location = %record.location, guid, error = %err, "could not fetch build log");
                None
            }
        }
    }
}

fn message_diagnostic(record: &JobRecord) -> Option<Diagnostic> {
    record.message().map(|text| Diagnostic::Message {
        text: text.to_owned(),
        documentation_url: record.documentation_url.clone(),
    })
}
