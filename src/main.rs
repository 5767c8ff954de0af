//! Binary entry point for the prebuild-cache CLI.

use std::fmt::Display;
use std::io::{self, Write};
use std::process;
use std::str::FromStr;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use prebuild_cache::{
    ConfigError, GitHubClient, PrebuildConfig, PrebuildOrchestrator, ProvisioningError, RunConfig,
    RunInputs,
};

mod cli;

use cli::Cli;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("client error: {0}")]
    Client(#[from] ProvisioningError),
}

impl CliError {
    const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Client(_) => 1,
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match run(cli).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            report_error(&err);
            err.exit_code()
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

async fn run(cli: Cli) -> Result<bool, CliError> {
    let inputs = run_inputs(cli)?;
    let defaults = PrebuildConfig::load_without_cli_args()?;
    let config = RunConfig::from_inputs(&inputs, &defaults)?;
    let client = GitHubClient::new(&config.client_config())?;

    let orchestrator = PrebuildOrchestrator::new(client, config.policy);
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let summary = orchestrator
        .execute(&config.params, &config.locations, &mut stdout, &mut stderr)
        .await;

    Ok(summary.all_succeeded())
}

fn run_inputs(cli: Cli) -> Result<RunInputs, ConfigError> {
    Ok(RunInputs {
        polling_delay_seconds: parse_number(cli.polling_delay.as_deref(), "POLLING_DELAY")?,
        max_polling_attempts: parse_number(
            cli.max_polling_attempts.as_deref(),
            "MAX_POLLING_ATTEMPTS",
        )?,
        git_ref: cli.git_ref.unwrap_or_default(),
        repository: cli.repository.unwrap_or_default(),
        sha: cli.sha.unwrap_or_default(),
        token: cli.token.unwrap_or_default(),
        regions: cli.regions.unwrap_or_default(),
        sku_name: cli.sku_name.unwrap_or_default(),
        target: cli.target,
        target_url: cli.target_url,
        api_url: cli.api_url,
    })
}

/// Parses an optional numeric input; blank values count as absent.
fn parse_number<T>(value: Option<&str>, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match value.map(str::trim).filter(|text| !text.is_empty()) {
        None => Ok(None),
        Some(text) => text.parse().map(Some).map_err(|err| {
            ConfigError::Invalid(format!(
                "{name} must be a non-negative integer, got '{text}': {err}"
            ))
        }),
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("prebuild-cache").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some("  "), None)]
    #[case(Some("0"), Some(0))]
    #[case(Some(" 42 "), Some(42))]
    fn blank_numbers_are_absent(#[case] raw: Option<&str>, #[case] expected: Option<u64>) {
        let parsed = parse_number::<u64>(raw, "POLLING_DELAY").expect("should parse");
        assert_eq!(parsed, expected);
    }

    #[test]
    fn malformed_number_names_its_input() {
        let err = parse_number::<u32>(Some("-3"), "MAX_POLLING_ATTEMPTS")
            .expect_err("negative count should be rejected");

        assert!(
            matches!(err, ConfigError::Invalid(ref message) if message.contains("MAX_POLLING_ATTEMPTS")),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn flags_map_onto_run_inputs() {
        let cli = parse(&[
            "--ref",
            "main",
            "--repository",
            "monalisa/smile",
            "--sha",
            "abcdef1234567890",
            "--token",
            "secret",
            "--regions",
            "WestUs2 EastUs1",
            "--sku-name",
            "futuristicQuantumComputer",
            "--target",
            "localdev",
            "--target-url",
            "http://localhost/example",
            "--api-url",
            "http://127.0.0.1:8888",
            "--polling-delay",
            "0",
            "--max-polling-attempts",
            "3",
        ]);

        let inputs = run_inputs(cli).expect("inputs should convert");

        assert_eq!(inputs.git_ref, "main");
        assert_eq!(inputs.repository, "monalisa/smile");
        assert_eq!(inputs.regions, "WestUs2 EastUs1");
        assert_eq!(inputs.target.as_deref(), Some("localdev"));
        assert_eq!(inputs.target_url.as_deref(), Some("http://localhost/example"));
        assert_eq!(inputs.api_url.as_deref(), Some("http://127.0.0.1:8888"));
        assert_eq!(inputs.polling_delay_seconds, Some(0));
        assert_eq!(inputs.max_polling_attempts, Some(3));
    }

    #[test]
    fn configuration_errors_exit_with_two() {
        let err = CliError::from(ConfigError::MissingField(String::from("missing regions")));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn client_errors_exit_with_one() {
        let err = CliError::from(ProvisioningError::Transport {
            message: String::from("no TLS backend"),
        });
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn write_error_writes_cli_error() {
        let mut buf = Vec::new();
        let err = CliError::Config(ConfigError::Invalid(String::from("bad repository")));
        write_error(&mut buf, &err);
        let rendered = String::from_utf8(buf).expect("utf8");
        assert!(
            rendered.contains("configuration error: invalid configuration: bad repository"),
            "rendered: {rendered}"
        );
    }
}
