//! Core library for the prebuild-cache tool.
//!
//! The crate asks a remote provisioning service to build a cached
//! development environment (a prebuild) in each configured region, polls the
//! resulting jobs round-robin until they finish or exhaust their attempt
//! budget, explains every failure as precisely as the service allows, and
//! reduces the run to a single pass/fail verdict.
//!
//! The service is reached through the [`ProvisioningClient`] capability;
//! [`GitHubClient`] implements it over HTTP.

pub mod client;
pub mod config;
pub mod diagnostic;
pub mod github;
pub mod job;
pub mod orchestrator;
pub mod registry;
pub mod request;
pub mod scheduler;
pub mod summary;
pub mod test_support;

pub use client::{ClientFuture, CreatedJob, JobStatus, ProvisioningClient, ProvisioningError};
pub use config::{ConfigError, DEFAULT_API_URL, PrebuildConfig, RunConfig, RunInputs};
pub use diagnostic::{Diagnostic, ErrorResolver, FALLBACK_MESSAGE};
pub use github::{GitHubClient, GitHubClientConfig};
pub use job::{JobRecord, JobState, ObservedState};
pub use orchestrator::{PollingPolicy, PrebuildOrchestrator};
pub use registry::{JobRegistry, RegistryError};
pub use request::{CreationRequest, RunParameters, TargetOverride};
pub use scheduler::{PollReport, PollingScheduler};
pub use summary::{LocationOutcome, OutcomeAggregator, RunSummary};
