//! Round-robin polling of pending prebuild jobs.
//!
//! A round visits every pending location once, in configured order. The
//! scheduler sleeps between rounds, never between individual checks, and
//! stops when nothing is pending or the round budget is spent. Locations
//! still pending at that point are expired as timed out.

use std::io::Write;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::client::ProvisioningClient;
use crate::job::{JobState, ObservedState};
use crate::registry::JobRegistry;

/// Outcome of driving a registry to completion.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PollReport {
    /// Number of rounds that issued at least one status check.
    pub rounds: u32,
    /// Total status checks issued.
    pub checks: u32,
    /// Locations forced to `TimedOut`, in configured order.
    pub timed_out: Vec<String>,
}

/// Drives pending jobs to a terminal state.
#[derive(Debug)]
pub struct PollingScheduler<'a, C> {
    client: &'a C,
    delay: Duration,
    max_rounds: u32,
}

impl<'a, C: ProvisioningClient> PollingScheduler<'a, C> {
    /// Creates a scheduler that checks every pending job at most
    /// `max_rounds` times, sleeping `delay` between rounds.
    #[must_use]
    pub const fn new(client: &'a C, delay: Duration, max_rounds: u32) -> Self {
        Self {
            client,
            delay,
            max_rounds,
        }
    }

    /// Polls until no job is pending or the round budget is exhausted.
    ///
    /// Progress lines are written to `out`; write failures are ignored.
    pub async fn drive<W: Write>(&self, registry: &mut JobRegistry, out: &mut W) -> PollReport {
        let mut report = PollReport::default();

        for round in 1..=self.max_rounds {
            let pending = registry.pending_locations();
            if pending.is_empty() {
                break;
            }

            debug!(round, pending = pending.len(), "starting polling round");
            report.rounds = round;
            for location in &pending {
                self.check(registry, location, out).await;
                report.checks += 1;
            }

            let more_rounds = round < self.max_rounds;
            if more_rounds && !registry.pending_locations().is_empty() && !self.delay.is_zero() {
                sleep(self.delay).await;
            }
        }

        report.timed_out = registry.expire_pending();
        for location in &report.timed_out {
            warn!(location = %location, rounds = self.max_rounds, "polling budget exhausted");
            writeln!(
                out,
                "{location}: still pending after {} status checks, giving up",
                self.max_rounds
            )
            .ok();
        }
        report
    }

    async fn check<W: Write>(&self, registry: &mut JobRegistry, location: &str, out: &mut W) {
        let Some(job_id) = registry.job_id(location).map(str::to_owned) else {
            return;
        };

        debug!(location, job_id = %job_id, "checking provisioning status");
        let applied = match self.client.job_status(&job_id).await {
            Ok(status) => {
                let token = status.state.clone();
                if let ObservedState::Unrecognized(ref unknown) = ObservedState::from_token(&token) {
                    warn!(location, state = %unknown, "unrecognized provisioning state, treating as failure");
                }
                registry.apply_status(location, status).map(|state| (state, token))
            }
            Err(err) => {
                warn!(location, error = %err, "status check failed");
                registry
                    .record_poll_failure(
                        location,
                        err.diagnostic_message(),
                        err.documentation_url().map(str::to_owned),
                    )
                    .map(|()| (JobState::Failed, String::from("error")))
            }
        };

        match applied {
            Ok((JobState::Pending, token)) => {
                writeln!(out, "{location}: {token}").ok();
            }
            Ok((state, _)) => {
                writeln!(out, "{location}: {state}").ok();
            }
            Err(err) => warn!(error = %err, "ignoring status for non-pending job"),
        }
    }
}
