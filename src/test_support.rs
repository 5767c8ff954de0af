//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::client::{ClientFuture, CreatedJob, JobStatus, ProvisioningClient, ProvisioningError};
use crate::request::CreationRequest;

/// A single call observed by [`ScriptedClient`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClientCall {
    /// Creation call for a location.
    Create {
        /// Location named in the request.
        location: String,
    },
    /// Status check for a job.
    Status {
        /// Job identifier polled.
        job_id: String,
    },
    /// Build log fetch for an environment.
    FetchLogs {
        /// Environment identifier requested.
        guid: String,
    },
}

/// Scripted provisioning client that replays canned responses.
///
/// Creation calls succeed with job id `<location>-job` unless a response was
/// scripted for the location. Status checks and log fetches pop responses in
/// FIFO order per job or guid and fail once the script is exhausted. Every
/// call is recorded so tests can assert exact ordering.
#[derive(Clone, Debug, Default)]
pub struct ScriptedClient {
    state: Arc<Mutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    creates: HashMap<String, Result<CreatedJob, ProvisioningError>>,
    statuses: HashMap<String, VecDeque<Result<JobStatus, ProvisioningError>>>,
    logs: HashMap<String, Result<String, ProvisioningError>>,
    calls: Vec<ClientCall>,
    requests: Vec<CreationRequest>,
}

impl ScriptedClient {
    /// Creates a client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scripts the job id returned when creating a job for `location`.
    pub fn create_returns(&self, location: &str, job_id: &str) {
        self.lock().creates.insert(
            location.to_owned(),
            Ok(CreatedJob {
                job_id: job_id.to_owned(),
                raw: format!("{{\"job_status_id\":\"{job_id}\"}}"),
            }),
        );
    }

    /// Scripts a rejected creation call for `location`.
    pub fn create_fails(&self, location: &str, error: ProvisioningError) {
        self.lock()
            .creates
            .insert(location.to_owned(), Err(error));
    }

    /// Queues bare state tokens for `job_id`, in order.
    pub fn push_states(&self, job_id: &str, states: &[&str]) {
        let mut state = self.lock();
        let queue = state.statuses.entry(job_id.to_owned()).or_default();
        queue.extend(states.iter().map(|token| Ok(JobStatus::with_state(*token))));
    }

    /// Queues a full status payload for `job_id`.
    pub fn push_status(&self, job_id: &str, status: JobStatus) {
        self.lock()
            .statuses
            .entry(job_id.to_owned())
            .or_default()
            .push_back(Ok(status));
    }

    /// Queues a failed status check for `job_id`.
    pub fn push_status_error(&self, job_id: &str, error: ProvisioningError) {
        self.lock()
            .statuses
            .entry(job_id.to_owned())
            .or_default()
            .push_back(Err(error));
    }

    /// Scripts the build log returned for `guid`.
    pub fn logs_return(&self, guid: &str, text: &str) {
        self.lock()
            .logs
            .insert(guid.to_owned(), Ok(text.to_owned()));
    }

    /// Scripts a failed build log fetch for `guid`.
    pub fn logs_fail(&self, guid: &str, error: ProvisioningError) {
        self.lock().logs.insert(guid.to_owned(), Err(error));
    }

    /// Returns a snapshot of every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ClientCall> {
        self.lock().calls.clone()
    }

    /// Returns the creation requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CreationRequest> {
        self.lock().requests.clone()
    }

    /// Counts status checks issued for `job_id`.
    #[must_use]
    pub fn status_calls_for(&self, job_id: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, ClientCall::Status { job_id: id } if id == job_id))
            .count()
    }

    /// Counts build log fetches issued.
    #[must_use]
    pub fn log_fetches(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, ClientCall::FetchLogs { .. }))
            .count()
    }

    fn exhausted(what: &str) -> ProvisioningError {
        ProvisioningError::Transport {
            message: format!("no scripted {what} response available"),
        }
    }
}

impl ProvisioningClient for ScriptedClient {
    fn create_job<'a>(&'a self, request: &'a CreationRequest) -> ClientFuture<'a, CreatedJob> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(ClientCall::Create {
                location: request.location.clone(),
            });
            state.requests.push(request.clone());
            state.creates.remove(&request.location).unwrap_or_else(|| {
                let job_id = format!("{}-job", request.location);
                Ok(CreatedJob {
                    raw: format!("{{\"job_status_id\":\"{job_id}\"}}"),
                    job_id,
                })
            })
        })
    }

    fn job_status<'a>(&'a self, job_id: &'a str) -> ClientFuture<'a, JobStatus> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(ClientCall::Status {
                job_id: job_id.to_owned(),
            });
            state
                .statuses
                .get_mut(job_id)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Err(Self::exhausted("status")))
        })
    }

    fn fetch_logs<'a>(&'a self, guid: &'a str) -> ClientFuture<'a, String> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(ClientCall::FetchLogs {
                guid: guid.to_owned(),
            });
            state
                .logs
                .get(guid)
                .cloned()
                .unwrap_or_else(|| Err(Self::exhausted("logs")))
        })
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
