//! In-memory registry of per-location job records for a single run.
//!
//! Records are kept in the order their locations were reserved, which is the
//! configured order. Every mutation goes through a checked transition so a
//! record's state can only move forward.

use thiserror::Error;
use tracing::info;

use crate::client::{CreatedJob, JobStatus};
use crate::job::{JobRecord, JobState, ObservedState};

/// Errors raised by illegal registry operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RegistryError {
    /// The location has no record.
    #[error("no job record for location {location}")]
    UnknownLocation {
        /// Location that was looked up.
        location: String,
    },
    /// The location already has a record.
    #[error("location {location} is already registered")]
    DuplicateLocation {
        /// Location that was reserved twice.
        location: String,
    },
    /// The requested transition would move a record backwards.
    #[error("location {location} cannot move from {from} to {to}")]
    IllegalTransition {
        /// Location of the record.
        location: String,
        /// Current state.
        from: JobState,
        /// Requested state.
        to: JobState,
    },
}

/// Owns every job record created during a run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct JobRegistry {
    records: Vec<JobRecord>,
}

impl JobRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record in the `Creating` state for a location.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateLocation`] when the location is
    /// already registered.
    pub fn reserve(&mut self, location: &str) -> Result<(), RegistryError> {
        if self.get(location).is_some() {
            return Err(RegistryError::DuplicateLocation {
                location: location.to_owned(),
            });
        }
        self.records.push(JobRecord::creating(location));
        Ok(())
    }

    /// Marks a location's job as created and ready for polling.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the location is unknown or was not
    /// awaiting creation.
    pub fn record_created(
        &mut self,
        location: &str,
        created: CreatedJob,
    ) -> Result<(), RegistryError> {
        let record = self.transition(location, JobState::Pending)?;
        record.job_id = Some(created.job_id);
        record.creation_response = Some(created.raw);
        record.attempts = 0;
        Ok(())
    }

    /// Marks a location's creation call as rejected.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the location is unknown or was not
    /// awaiting creation.
    pub fn record_creation_failed(
        &mut self,
        location: &str,
        message: String,
        documentation_url: Option<String>,
    ) -> Result<(), RegistryError> {
        let record = self.transition(location, JobState::CreationFailed)?;
        record.last_message = Some(message);
        record.documentation_url = documentation_url;
        Ok(())
    }

    /// Locations still awaiting a terminal status, in configured order.
    #[must_use]
    pub fn pending_locations(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.state == JobState::Pending)
            .map(|record| record.location.clone())
            .collect()
    }

    /// Job identifier of a location, when the job was created.
    #[must_use]
    pub fn job_id(&self, location: &str) -> Option<&str> {
        self.get(location)
            .and_then(|record| record.job_id.as_deref())
    }

    /// Applies the response of a successful status check.
    ///
    /// Messages attached to in-progress statuses are progress notes and are
    /// not kept; only the terminal status's message is recorded. Returns the
    /// new state of the record.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the location is unknown or no longer
    /// pending.
    pub fn apply_status(
        &mut self,
        location: &str,
        status: JobStatus,
    ) -> Result<JobState, RegistryError> {
        let next = match ObservedState::from_token(&status.state) {
            ObservedState::Succeeded => JobState::Succeeded,
            ObservedState::InProgress => JobState::Pending,
            ObservedState::Failed | ObservedState::Unrecognized(_) => JobState::Failed,
        };

        let record = self.transition(location, next)?;
        record.attempts += 1;
        record.last_state = Some(status.state);
        if next != JobState::Pending {
            record.last_message = status.message;
        }
        if next == JobState::Failed {
            record.error_logs_available = status.error_logs_available;
            record.guid = status.guid;
        }

        if next != JobState::Pending {
            info!(location, state = %next, attempts = record.attempts, "job reached terminal state");
        }
        Ok(next)
    }

    /// Marks a pending location as failed after its status check errored.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the location is unknown or no longer
    /// pending.
    pub fn record_poll_failure(
        &mut self,
        location: &str,
        message: String,
        documentation_url: Option<String>,
    ) -> Result<(), RegistryError> {
        let record = self.transition(location, JobState::Failed)?;
        record.attempts += 1;
        record.last_message = Some(message);
        record.documentation_url = documentation_url;
        Ok(())
    }

    /// Forces every still-pending record to `TimedOut`.
    ///
    /// Returns the locations that were expired.
    pub fn expire_pending(&mut self) -> Vec<String> {
        self.records
            .iter_mut()
            .filter(|record| record.state == JobState::Pending)
            .map(|record| {
                record.state = JobState::TimedOut;
                record.location.clone()
            })
            .collect()
    }

    /// Looks up the record of a location.
    #[must_use]
    pub fn get(&self, location: &str) -> Option<&JobRecord> {
        self.records
            .iter()
            .find(|record| record.location == location)
    }

    /// All records in configured order.
    #[must_use]
    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    /// Consumes the registry and returns its records in configured order.
    #[must_use]
    pub fn into_records(self) -> Vec<JobRecord> {
        self.records
    }

    fn transition(
        &mut self,
        location: &str,
        next: JobState,
    ) -> Result<&mut JobRecord, RegistryError> {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.location == location)
            .ok_or_else(|| RegistryError::UnknownLocation {
                location: location.to_owned(),
            })?;

        if !record.state.can_transition_to(next) {
            return Err(RegistryError::IllegalTransition {
                location: location.to_owned(),
                from: record.state,
                to: next,
            });
        }

        record.state = next;
        Ok(record)
    }
}
