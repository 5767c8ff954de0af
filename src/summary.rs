//! Reduction of the final registry into a run verdict.

use std::fmt;
use std::io::Write;

use crate::diagnostic::Diagnostic;
use crate::job::{JobRecord, JobState};

/// Final outcome of a single location.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocationOutcome {
    /// Final job record.
    pub record: JobRecord,
    /// Diagnostic resolved for unsuccessful locations.
    pub diagnostic: Option<Diagnostic>,
}

impl LocationOutcome {
    /// Returns `true` when the location's prebuild succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.record.state == JobState::Succeeded
    }
}

impl fmt::Display for LocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = &self.record;
        write!(f, "{}: {}", record.location, record.state)?;
        if let Some(job_id) = &record.job_id {
            write!(f, " (job {job_id}, {} status checks)", record.attempts)?;
        }
        if let Some(raw) = &record.creation_response {
            write!(f, " response: {}", raw.trim())?;
        }
        Ok(())
    }
}

/// Verdict and per-location outcomes of a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunSummary {
    /// Outcomes in configured order.
    pub outcomes: Vec<LocationOutcome>,
}

impl RunSummary {
    /// Returns `true` only when every location succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(LocationOutcome::succeeded)
    }

    /// Number of locations that did not succeed.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.succeeded())
            .count()
    }

    /// Writes the per-location summary block and the verdict to `out`.
    pub fn write_summary<W: Write>(&self, out: &mut W) {
        writeln!(out, "Prebuild summary:").ok();
        for outcome in &self.outcomes {
            writeln!(out, "  {outcome}").ok();
        }
        if self.all_succeeded() {
            writeln!(out, "All {} prebuilds succeeded.", self.outcomes.len()).ok();
        } else {
            writeln!(
                out,
                "{} of {} prebuilds did not succeed.",
                self.failures(),
                self.outcomes.len()
            )
            .ok();
        }
    }

    /// Writes every resolved diagnostic to `err`, in configured order.
    pub fn write_diagnostics<W: Write>(&self, err: &mut W) {
        for outcome in &self.outcomes {
            if let Some(diagnostic) = &outcome.diagnostic {
                writeln!(err, "{}: {diagnostic}", outcome.record.location).ok();
            }
        }
    }
}

/// Builds run summaries from final job records.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutcomeAggregator;

impl OutcomeAggregator {
    /// Pairs each record with its diagnostic and computes the verdict.
    ///
    /// Records without a matching diagnostic keep `None`; extra diagnostics
    /// are ignored.
    #[must_use]
    pub fn aggregate(
        records: Vec<JobRecord>,
        mut diagnostics: Vec<(String, Diagnostic)>,
    ) -> RunSummary {
        let outcomes = records
            .into_iter()
            .map(|record| {
                let diagnostic = diagnostics
                    .iter()
                    .position(|(location, _)| *location == record.location)
                    .map(|index| diagnostics.swap_remove(index).1);
                LocationOutcome { record, diagnostic }
            })
            .collect();
        RunSummary { outcomes }
    }
}
