//! Per-location job records and provisioning state classification.

use std::fmt;

/// Lifecycle state of a single location's prebuild job.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum JobState {
    /// The creation call has not completed yet.
    Creating,
    /// The job exists and is still being provisioned.
    Pending,
    /// The provisioning API reported success.
    Succeeded,
    /// The provisioning API reported failure, or a status check failed.
    Failed,
    /// The creation call itself was rejected.
    CreationFailed,
    /// The polling budget ran out while the job was still pending.
    TimedOut,
}

impl JobState {
    /// Returns `true` when no further transition can occur.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::CreationFailed | Self::TimedOut
        )
    }

    /// Returns `true` when `next` is reachable from this state in one step.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Creating, Self::Pending | Self::CreationFailed)
                | (
                    Self::Pending,
                    Self::Pending | Self::Succeeded | Self::Failed | Self::TimedOut
                )
        )
    }

    /// Short lowercase label used in summaries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::CreationFailed => "creation failed",
            Self::TimedOut => "timed out",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification of a state token reported by the provisioning API.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ObservedState {
    /// The prebuild is ready.
    Succeeded,
    /// The prebuild failed.
    Failed,
    /// The prebuild is still being worked on.
    InProgress,
    /// A token outside the known vocabulary.
    Unrecognized(String),
}

const SUCCESS_TOKENS: &[&str] = &["succeeded", "success", "complete", "completed"];
const FAILURE_TOKENS: &[&str] = &["failed", "failure", "error"];
const IN_PROGRESS_TOKENS: &[&str] = &[
    "processing",
    "pending",
    "queued",
    "running",
    "in_progress",
    "provisioning",
];

impl ObservedState {
    /// Classifies a raw state token, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        let normalised = token.trim().to_ascii_lowercase();
        let known = |tokens: &[&str]| tokens.contains(&normalised.as_str());

        if known(SUCCESS_TOKENS) {
            Self::Succeeded
        } else if known(FAILURE_TOKENS) {
            Self::Failed
        } else if known(IN_PROGRESS_TOKENS) {
            Self::InProgress
        } else {
            Self::Unrecognized(token.trim().to_owned())
        }
    }
}

/// Tracks one location's job from creation to a terminal state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JobRecord {
    /// Location whose creation request spawned this record.
    pub location: String,
    /// Identifier assigned on successful creation.
    pub job_id: Option<String>,
    /// Current lifecycle state.
    pub state: JobState,
    /// Number of status checks issued so far.
    pub attempts: u32,
    /// Most recent diagnostic text from the API.
    pub last_message: Option<String>,
    /// Documentation link supplied alongside an API error.
    pub documentation_url: Option<String>,
    /// Raw state token from the most recent status check.
    pub last_state: Option<String>,
    /// Whether the API reported build logs for a failed job.
    pub error_logs_available: bool,
    /// Environment identifier used to fetch build logs.
    pub guid: Option<String>,
    /// Raw creation response body, echoed in the summary.
    pub creation_response: Option<String>,
}

impl JobRecord {
    /// Creates a record for a location whose creation call is in flight.
    #[must_use]
    pub fn creating(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            job_id: None,
            state: JobState::Creating,
            attempts: 0,
            last_message: None,
            documentation_url: None,
            last_state: None,
            error_logs_available: false,
            guid: None,
            creation_response: None,
        }
    }

    /// Returns the last message when it carries any text.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.last_message
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}
