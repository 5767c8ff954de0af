//! Orchestrates a prebuild run across every configured location.
//!
//! The run issues one creation request per location in configured order,
//! finishing every creation before any status check, then polls the created
//! jobs round-robin, resolves diagnostics for unsuccessful locations, and
//! reduces everything to a [`RunSummary`]. A failure in one location never
//! stops work on another.

use std::io::Write;
use std::time::Duration;

use tracing::{info, warn};

use crate::client::ProvisioningClient;
use crate::diagnostic::ErrorResolver;
use crate::registry::JobRegistry;
use crate::request::RunParameters;
use crate::scheduler::PollingScheduler;
use crate::summary::{OutcomeAggregator, RunSummary};

/// Polling limits applied to a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollingPolicy {
    /// Pause between polling rounds. Zero disables waiting.
    pub delay: Duration,
    /// Maximum number of status checks per location.
    pub max_attempts: u32,
}

/// Executes prebuild runs through a provisioning client.
#[derive(Debug)]
pub struct PrebuildOrchestrator<C> {
    client: C,
    policy: PollingPolicy,
}

impl<C: ProvisioningClient> PrebuildOrchestrator<C> {
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(client: C, policy: PollingPolicy) -> Self {
        Self { client, policy }
    }

    /// Runs the full workflow for `locations`.
    ///
    /// The progress narrative and summary go to `out`; diagnostics for
    /// unsuccessful locations go to `err`. This never fails: every problem a
    /// location meets is reflected in the returned summary.
    pub async fn execute<S, O, E>(
        &self,
        params: &RunParameters,
        locations: &[S],
        out: &mut O,
        err: &mut E,
    ) -> RunSummary
    where
        S: AsRef<str>,
        O: Write,
        E: Write,
    {
        let mut registry = JobRegistry::new();
        self.create_all(params, locations, &mut registry, out).await;

        PollingScheduler::new(&self.client, self.policy.delay, self.policy.max_attempts)
            .drive(&mut registry, out)
            .await;

        let mut resolver = ErrorResolver::new(&self.client);
        let mut diagnostics = Vec::new();
        for record in registry.records() {
            if let Some(diagnostic) = resolver.resolve(record).await {
                diagnostics.push((record.location.clone(), diagnostic));
            }
        }

        let summary = OutcomeAggregator::aggregate(registry.into_records(), diagnostics);
        summary.write_diagnostics(err);
        summary.write_summary(out);
        info!(
            succeeded = summary.all_succeeded(),
            failures = summary.failures(),
            "prebuild run finished"
        );
        summary
    }

    async fn create_all<S, O>(
        &self,
        params: &RunParameters,
        locations: &[S],
        registry: &mut JobRegistry,
        out: &mut O,
    ) where
        S: AsRef<str>,
        O: Write,
    {
        for request in params.requests_for(locations) {
            let location = request.location.as_str();
            if let Err(reserve_err) = registry.reserve(location) {
                warn!(error = %reserve_err, "skipping duplicate location");
                continue;
            }

            writeln!(out, "Requesting prebuild in {location}").ok();
            let recorded = match self.client.create_job(&request).await {
                Ok(created) => {
                    info!(location, job_id = %created.job_id, "prebuild job created");
                    writeln!(out, "{location}: created job {}", created.job_id).ok();
                    registry.record_created(location, created)
                }
                Err(create_err) => {
                    warn!(location, error = %create_err, "prebuild creation failed");
                    writeln!(out, "{location}: creation failed").ok();
                    registry.record_creation_failed(
                        location,
                        create_err.diagnostic_message(),
                        create_err.documentation_url().map(str::to_owned),
                    )
                }
            };
            if let Err(registry_err) = recorded {
                warn!(error = %registry_err, "could not record creation outcome");
            }
        }
    }
}
