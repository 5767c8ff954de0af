//! Configuration loading via `ortho-config` and run-level validation.
//!
//! Tuning defaults (API endpoint, polling cadence, timeouts) merge defaults,
//! configuration files, and `PREBUILD_*` environment variables. Run
//! parameters arrive from the command line or the GitHub Actions environment
//! and are validated into a [`RunConfig`].

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::github::GitHubClientConfig;
use crate::orchestrator::PollingPolicy;
use crate::request::{RunParameters, TargetOverride};

/// Default GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Tuning defaults loaded from files and `PREBUILD_*` environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "PREBUILD",
    discovery(
        app_name = "prebuild-cache",
        env_var = "PREBUILD_CONFIG_PATH",
        config_file_name = "prebuild-cache.toml",
        dotfile_name = ".prebuild-cache.toml",
        project_file_name = "prebuild-cache.toml"
    )
)]
pub struct PrebuildConfig {
    /// Base URL of the GitHub API.
    #[ortho_config(default = DEFAULT_API_URL.to_owned())]
    pub api_url: String,
    /// Seconds to wait between polling rounds. Zero disables waiting.
    #[ortho_config(default = 10)]
    pub polling_delay_seconds: u64,
    /// Maximum status checks per location before giving up.
    #[ortho_config(default = 180)]
    pub max_polling_attempts: u32,
    /// Per-request HTTP timeout in seconds.
    #[ortho_config(default = 30)]
    pub request_timeout_seconds: u64,
}

impl PrebuildConfig {
    /// Loads configuration without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("prebuild-cache")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }
}

/// Unvalidated run inputs, as collected by the command-line layer.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunInputs {
    /// Git ref to prebuild.
    pub git_ref: String,
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Commit SHA to prebuild.
    pub sha: String,
    /// API token.
    pub token: String,
    /// Whitespace- or comma-separated list of regions.
    pub regions: String,
    /// Machine SKU name.
    pub sku_name: String,
    /// Optional target override name.
    pub target: Option<String>,
    /// Optional target override URL.
    pub target_url: Option<String>,
    /// Overrides [`PrebuildConfig::api_url`].
    pub api_url: Option<String>,
    /// Overrides [`PrebuildConfig::polling_delay_seconds`].
    pub polling_delay_seconds: Option<u64>,
    /// Overrides [`PrebuildConfig::max_polling_attempts`].
    pub max_polling_attempts: Option<u32>,
}

/// Validated configuration for a single run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunConfig {
    /// Parameters shared by every creation request.
    pub params: RunParameters,
    /// Regions to prebuild in, in configured order.
    pub locations: Vec<String>,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repository: String,
    /// API token.
    pub token: String,
    /// Base URL of the GitHub API.
    pub api_url: String,
    /// Polling limits.
    pub policy: PollingPolicy,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    flag: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, flag: &'static str) -> Self {
        Self {
            description,
            env_var,
            flag,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or pass {}",
            self.description, self.env_var, self.flag
        ))
    }
}

const REF: FieldMetadata = FieldMetadata::new("git ref", "GITHUB_REF", "--ref");
const REPOSITORY: FieldMetadata =
    FieldMetadata::new("repository", "GITHUB_REPOSITORY", "--repository");
const SHA: FieldMetadata = FieldMetadata::new("commit SHA", "GITHUB_SHA", "--sha");
const TOKEN: FieldMetadata = FieldMetadata::new("API token", "GITHUB_TOKEN", "--token");
const REGIONS: FieldMetadata = FieldMetadata::new("regions", "INPUT_REGIONS", "--regions");
const SKU_NAME: FieldMetadata = FieldMetadata::new("SKU name", "INPUT_SKU_NAME", "--sku-name");
const TARGET: FieldMetadata = FieldMetadata::new("target", "INPUT_TARGET", "--target");
const TARGET_URL: FieldMetadata =
    FieldMetadata::new("target URL", "INPUT_TARGET_URL", "--target-url");

fn require(value: &str, metadata: &FieldMetadata) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(metadata.missing());
    }
    Ok(trimmed.to_owned())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

/// Splits a region list on whitespace and commas, preserving order.
#[must_use]
pub fn parse_regions(raw: &str) -> Vec<String> {
    raw.split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

impl RunConfig {
    /// Validates `inputs` against the tuning defaults in `defaults`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required value is missing or a value is
    /// malformed.
    pub fn from_inputs(inputs: &RunInputs, defaults: &PrebuildConfig) -> Result<Self, ConfigError> {
        let git_ref = require(&inputs.git_ref, &REF)?;
        let sha = require(&inputs.sha, &SHA)?;
        let token = require(&inputs.token, &TOKEN)?;
        let sku_name = require(&inputs.sku_name, &SKU_NAME)?;
        let (owner, repository) = split_repository(&require(&inputs.repository, &REPOSITORY)?)?;
        let locations = validate_regions(&inputs.regions)?;
        let target = validate_target(inputs.target.as_deref(), inputs.target_url.as_deref())?;

        let api_url = optional(inputs.api_url.as_deref()).unwrap_or_else(|| defaults.api_url.clone());
        if api_url.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from("api_url must not be empty")));
        }

        let max_attempts = inputs
            .max_polling_attempts
            .unwrap_or(defaults.max_polling_attempts);
        if max_attempts == 0 {
            return Err(ConfigError::Invalid(String::from(
                "max polling attempts must be at least 1 (MAX_POLLING_ATTEMPTS)",
            )));
        }
        let delay = inputs
            .polling_delay_seconds
            .unwrap_or(defaults.polling_delay_seconds);

        Ok(Self {
            params: RunParameters {
                git_ref,
                sha,
                sku_name,
                target,
            },
            locations,
            owner,
            repository,
            token,
            api_url,
            policy: PollingPolicy {
                delay: Duration::from_secs(delay),
                max_attempts,
            },
            request_timeout: Duration::from_secs(defaults.request_timeout_seconds),
        })
    }

    /// Connection settings for the HTTP client.
    #[must_use]
    pub fn client_config(&self) -> GitHubClientConfig {
        GitHubClientConfig {
            api_url: self.api_url.clone(),
            owner: self.owner.clone(),
            repository: self.repository.clone(),
            token: self.token.clone(),
            timeout: self.request_timeout,
        }
    }
}

fn split_repository(value: &str) -> Result<(String, String), ConfigError> {
    match value.split_once('/') {
        Some((owner, name))
            if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok((owner.to_owned(), name.to_owned()))
        }
        _ => Err(ConfigError::Invalid(format!(
            "repository must look like owner/name, got '{value}' (GITHUB_REPOSITORY)"
        ))),
    }
}

fn validate_regions(raw: &str) -> Result<Vec<String>, ConfigError> {
    let regions = parse_regions(raw);
    if regions.is_empty() {
        return Err(REGIONS.missing());
    }
    for (index, region) in regions.iter().enumerate() {
        if regions.iter().take(index).any(|earlier| earlier == region) {
            return Err(ConfigError::Invalid(format!(
                "region {region} is listed more than once (INPUT_REGIONS)"
            )));
        }
    }
    Ok(regions)
}

fn validate_target(
    target: Option<&str>,
    target_url: Option<&str>,
) -> Result<Option<TargetOverride>, ConfigError> {
    match (optional(target), optional(target_url)) {
        (Some(name), Some(url)) => Ok(Some(TargetOverride {
            target: name,
            target_url: url,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(TARGET_URL.missing()),
        (None, Some(_)) => Err(TARGET.missing()),
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration value is malformed.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
