//! BDD scenarios for prebuild orchestration.

use rstest_bdd_macros::scenario;

use super::test_helpers::{
    OrchestrationContext, RunOutcome, orchestration_context, run_outcome,
};

#[scenario(
    path = "tests/features/orchestration.feature",
    name = "Every region succeeds"
)]
fn scenario_every_region_succeeds(
    orchestration_context: OrchestrationContext,
    run_outcome: RunOutcome,
) {
    let _ = (orchestration_context, run_outcome);
}

#[scenario(
    path = "tests/features/orchestration.feature",
    name = "A failed job explains itself with its build log"
)]
fn scenario_build_log_diagnostic(
    orchestration_context: OrchestrationContext,
    run_outcome: RunOutcome,
) {
    let _ = (orchestration_context, run_outcome);
}

#[scenario(
    path = "tests/features/orchestration.feature",
    name = "A failure message takes priority over the build log"
)]
fn scenario_message_diagnostic(
    orchestration_context: OrchestrationContext,
    run_outcome: RunOutcome,
) {
    let _ = (orchestration_context, run_outcome);
}

#[scenario(
    path = "tests/features/orchestration.feature",
    name = "A rejected creation is never polled"
)]
fn scenario_rejected_creation(
    orchestration_context: OrchestrationContext,
    run_outcome: RunOutcome,
) {
    let _ = (orchestration_context, run_outcome);
}

#[scenario(
    path = "tests/features/orchestration.feature",
    name = "A job that never finishes times out"
)]
fn scenario_timeout(orchestration_context: OrchestrationContext, run_outcome: RunOutcome) {
    let _ = (orchestration_context, run_outcome);
}
