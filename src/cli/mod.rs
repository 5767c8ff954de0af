//! Command-line interface definitions for the `prebuild-cache` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.
//!
//! Every argument falls back to the environment variable a GitHub Actions
//! runner provides, so the binary can run as an action step without flags.

use clap::Parser;

/// Top-level CLI for the `prebuild-cache` binary.
#[derive(Debug, Parser)]
#[command(
    name = "prebuild-cache",
    version,
    about = "Request cached development-environment prebuilds across regions and wait for them"
)]
pub(crate) struct Cli {
    /// Git ref to prebuild.
    #[arg(long = "ref", env = "GITHUB_REF", value_name = "REF")]
    pub(crate) git_ref: Option<String>,
    /// Repository in owner/name form.
    #[arg(long, env = "GITHUB_REPOSITORY", value_name = "OWNER/NAME")]
    pub(crate) repository: Option<String>,
    /// Commit SHA to prebuild.
    #[arg(long, env = "GITHUB_SHA", value_name = "SHA")]
    pub(crate) sha: Option<String>,
    /// API token used as a bearer credential.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub(crate) token: Option<String>,
    /// Regions to prebuild in, separated by whitespace or commas.
    #[arg(long, env = "INPUT_REGIONS", value_name = "REGIONS")]
    pub(crate) regions: Option<String>,
    /// Machine SKU the prebuild targets.
    #[arg(long, env = "INPUT_SKU_NAME", value_name = "SKU")]
    pub(crate) sku_name: Option<String>,
    /// Alternative provisioning target. Requires --target-url.
    #[arg(long, env = "INPUT_TARGET", value_name = "TARGET")]
    pub(crate) target: Option<String>,
    /// URL of the alternative provisioning target. Requires --target.
    #[arg(long, env = "INPUT_TARGET_URL", value_name = "URL")]
    pub(crate) target_url: Option<String>,
    /// Base URL of the GitHub API.
    #[arg(long, env = "GITHUB_API_URL", value_name = "URL")]
    pub(crate) api_url: Option<String>,
    /// Seconds to wait between polling rounds (0 disables waiting).
    #[arg(long, env = "POLLING_DELAY", value_name = "SECONDS")]
    pub(crate) polling_delay: Option<String>,
    /// Status checks per region before giving up.
    #[arg(long, env = "MAX_POLLING_ATTEMPTS", value_name = "COUNT")]
    pub(crate) max_polling_attempts: Option<String>,
}
