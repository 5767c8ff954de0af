//! BDD step definitions for prebuild orchestration.

use std::time::Duration;

use prebuild_cache::{
    JobStatus, PollingPolicy, PrebuildOrchestrator, ProvisioningError, RunParameters,
};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{OrchestrationContext, RunOutcome, job_id};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn params() -> RunParameters {
    RunParameters {
        git_ref: String::from("main"),
        sha: String::from("abcdef1234567890"),
        sku_name: String::from("futuristicQuantumComputer"),
        target: None,
    }
}

#[given("prebuilds are requested in \"{regions}\"")]
fn prebuilds_requested(orchestration_context: &OrchestrationContext, regions: String) {
    orchestration_context
        .locations
        .replace(regions.split_whitespace().map(str::to_owned).collect());
}

#[given("each job gets {attempts} status checks")]
fn attempt_budget(orchestration_context: &OrchestrationContext, attempts: u32) {
    orchestration_context.max_attempts.set(attempts);
}

#[given("the job for \"{location}\" reports \"{states}\"")]
fn job_reports(orchestration_context: &OrchestrationContext, location: String, states: String) {
    let tokens = states.split_whitespace().collect::<Vec<_>>();
    orchestration_context
        .client
        .push_states(&job_id(&location), &tokens);
}

#[given("the job for \"{location}\" fails with build log \"{log}\"")]
fn job_fails_with_log(orchestration_context: &OrchestrationContext, location: String, log: String) {
    let guid = format!("{location}-environment");
    orchestration_context.client.push_status(
        &job_id(&location),
        JobStatus {
            state: String::from("failed"),
            message: None,
            error_logs_available: true,
            guid: Some(guid.clone()),
        },
    );
    orchestration_context.client.logs_return(&guid, &log);
}

#[given("the job for \"{location}\" fails with message \"{message}\"")]
fn job_fails_with_message(
    orchestration_context: &OrchestrationContext,
    location: String,
    message: String,
) {
    orchestration_context.client.push_status(
        &job_id(&location),
        JobStatus {
            state: String::from("failed"),
            message: Some(message),
            error_logs_available: true,
            guid: Some(format!("{location}-environment")),
        },
    );
}

#[given("creation for \"{location}\" is rejected with \"{message}\"")]
fn creation_rejected(orchestration_context: &OrchestrationContext, location: String, message: String) {
    orchestration_context.client.create_fails(
        &location,
        ProvisioningError::Api {
            status: 404,
            message,
            documentation_url: None,
        },
    );
}

#[when("the prebuild run executes")]
fn run_executes(orchestration_context: &OrchestrationContext) -> Result<RunOutcome, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let orchestrator = PrebuildOrchestrator::new(
        orchestration_context.client.clone(),
        PollingPolicy {
            delay: Duration::ZERO,
            max_attempts: orchestration_context.max_attempts.get(),
        },
    );
    let locations = orchestration_context.locations.borrow().clone();

    let mut out = Vec::new();
    let mut err = Vec::new();
    let summary = runtime.block_on(async {
        orchestrator
            .execute(&params(), &locations, &mut out, &mut err)
            .await
    });

    Ok(RunOutcome {
        summary: Some(summary),
        stdout: String::from_utf8_lossy(&out).into_owned(),
        stderr: String::from_utf8_lossy(&err).into_owned(),
        calls: orchestration_context.client.calls(),
    })
}

fn verdict(run_outcome: &RunOutcome) -> Result<bool, StepError> {
    run_outcome
        .summary
        .as_ref()
        .map(prebuild_cache::RunSummary::all_succeeded)
        .ok_or_else(|| StepError::Assertion(String::from("the run has not executed")))
}

#[then("the run succeeds")]
fn run_succeeds(run_outcome: &RunOutcome) -> Result<(), StepError> {
    if verdict(run_outcome)? {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected success, got summary:\n{}",
            run_outcome.stdout
        )))
    }
}

#[then("the run fails")]
fn run_fails(run_outcome: &RunOutcome) -> Result<(), StepError> {
    if verdict(run_outcome)? {
        Err(StepError::Assertion(format!(
            "expected failure, got summary:\n{}",
            run_outcome.stdout
        )))
    } else {
        Ok(())
    }
}

#[then("the summary lists \"{first}\" before \"{second}\"")]
fn summary_order(run_outcome: &RunOutcome, first: String, second: String) -> Result<(), StepError> {
    let position = |location: &str| {
        run_outcome
            .stdout
            .find(&format!("  {location}: "))
            .ok_or_else(|| StepError::Assertion(format!("{location} missing from summary")))
    };
    if position(&first)? < position(&second)? {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "{first} should precede {second} in:\n{}",
            run_outcome.stdout
        )))
    }
}

#[then("the summary reports \"{location}\" as \"{state}\"")]
fn summary_state(run_outcome: &RunOutcome, location: String, state: String) -> Result<(), StepError> {
    let line = format!("  {location}: {state}");
    if run_outcome.stdout.contains(&line) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected '{line}' in summary:\n{}",
            run_outcome.stdout
        )))
    }
}

#[then("status checks are made in the order \"{order}\"")]
fn status_order(run_outcome: &RunOutcome, order: String) -> Result<(), StepError> {
    let expected = order.split_whitespace().map(str::to_owned).collect::<Vec<_>>();
    let actual = run_outcome.status_locations();
    if actual == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected status checks {expected:?}, got {actual:?}"
        )))
    }
}

#[then("the diagnostics mention \"{text}\"")]
fn diagnostics_mention(run_outcome: &RunOutcome, text: String) -> Result<(), StepError> {
    if run_outcome.stderr.contains(&text) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected '{text}' in diagnostics:\n{}",
            run_outcome.stderr
        )))
    }
}

#[then("the number of build log fetches is {count}")]
fn log_fetch_count(run_outcome: &RunOutcome, count: usize) -> Result<(), StepError> {
    let actual = run_outcome.log_fetches();
    if actual == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} build log fetches, got {actual}"
        )))
    }
}
