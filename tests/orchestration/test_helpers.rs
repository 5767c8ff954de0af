//! Shared fixtures for orchestration BDD scenarios.
//!
//! Given steps configure the context in place through interior mutability;
//! only the run step produces a new value.

use std::cell::{Cell, RefCell};

use prebuild_cache::RunSummary;
use prebuild_cache::test_support::{ClientCall, ScriptedClient};
use rstest::fixture;

#[derive(Debug)]
pub struct OrchestrationContext {
    pub client: ScriptedClient,
    pub locations: RefCell<Vec<String>>,
    pub max_attempts: Cell<u32>,
}

#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub summary: Option<RunSummary>,
    pub stdout: String,
    pub stderr: String,
    pub calls: Vec<ClientCall>,
}

impl RunOutcome {
    pub fn status_locations(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ClientCall::Status { job_id } => {
                    Some(job_id.trim_end_matches("-job").to_owned())
                }
                ClientCall::Create { .. } | ClientCall::FetchLogs { .. } => None,
            })
            .collect()
    }

    pub fn log_fetches(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, ClientCall::FetchLogs { .. }))
            .count()
    }
}

#[fixture]
pub fn orchestration_context() -> OrchestrationContext {
    OrchestrationContext {
        client: ScriptedClient::new(),
        locations: RefCell::new(Vec::new()),
        max_attempts: Cell::new(10),
    }
}

#[fixture]
pub fn run_outcome() -> RunOutcome {
    RunOutcome {
        summary: None,
        stdout: String::new(),
        stderr: String::new(),
        calls: Vec::new(),
    }
}

pub fn job_id(location: &str) -> String {
    format!("{location}-job")
}
