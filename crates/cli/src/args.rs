//! Command-line and action-input parsing.
//!
//! GitHub Actions exposes each `with:` input as `INPUT_<NAME>` (upper-cased,
//! spaces replaced by `_`, hyphens kept). Every input is also accepted as a
//! `--flag` for local runs. Values are trimmed; blank values count as absent.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use github::{ClientSettings, DEFAULT_API_URL};
use relay::{
    PhoneHomeReport, RawRelayConfig, RelayConfig, RelayError, ReturnAddress, StatusState,
};

/// Trigger a workflow in another repository and report back on this commit.
#[derive(Debug, Parser)]
#[command(name = "workflow-relay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub dispatch: DispatchArgs,

    #[command(flatten)]
    pub client: ClientArgs,

    /// Log output format.
    #[arg(
        long,
        env = "INPUT_LOG-FORMAT",
        value_enum,
        ignore_case = true,
        default_value_t = LogFormat::Text,
        global = true
    )]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Dispatch the workflow and report a pending status (the default).
    Dispatch,
    /// Post a status back to the origin commit from a dispatched workflow,
    /// using the phone-home value it received.
    Report(ReportArgs),
}

/// Inputs of the dispatch flow.
#[derive(Debug, Default, Args)]
pub struct DispatchArgs {
    /// Token allowed to dispatch workflows on the target repository.
    #[arg(long, env = "INPUT_DISPATCH-TOKEN", hide_env_values = true)]
    pub dispatch_token: Option<String>,

    /// Target repository (`owner/repo`).
    #[arg(long, env = "INPUT_DISPATCH-REPOSITORY")]
    pub dispatch_repository: Option<String>,

    /// Branch, tag, or SHA the workflow runs on.
    #[arg(long, env = "INPUT_DISPATCH-REF")]
    pub dispatch_ref: Option<String>,

    /// Workflow file name or id.
    #[arg(long, env = "INPUT_DISPATCH-WORKFLOW")]
    pub dispatch_workflow: Option<String>,

    /// Status context on the origin commit.
    #[arg(long, env = "INPUT_STATUS-CONTEXT")]
    pub status_context: Option<String>,

    /// Token allowed to post statuses on the origin repository.
    #[arg(long, env = "INPUT_STATUS-TOKEN", hide_env_values = true)]
    pub status_token: Option<String>,

    /// Origin repository (`owner/repo`).
    #[arg(long, env = "INPUT_STATUS-REPOSITORY")]
    pub status_repository: Option<String>,

    /// Origin commit SHA.
    #[arg(long, env = "INPUT_STATUS-SHA")]
    pub status_sha: Option<String>,

    /// Workflow inputs as a JSON object.
    #[arg(long, env = "INPUT_INPUTS")]
    pub inputs: Option<String>,

    /// Name of the input that carries the phone-home value.
    #[arg(long, env = "INPUT_PHONE-HOME-INPUT-NAME")]
    pub phone_home_input_name: Option<String>,
}

impl DispatchArgs {
    pub fn into_config(self) -> Result<RelayConfig, RelayError> {
        RelayConfig::from_raw(RawRelayConfig {
            dispatch_token: self.dispatch_token,
            dispatch_repository: self.dispatch_repository,
            dispatch_ref: self.dispatch_ref,
            dispatch_workflow: self.dispatch_workflow,
            status_context: self.status_context,
            status_token: self.status_token,
            status_repository: self.status_repository,
            status_sha: self.status_sha,
            inputs: self.inputs,
            phone_home_input_name: self.phone_home_input_name,
        })
    }
}

/// Inputs of the `report` subcommand.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// The phone-home value received as a workflow input.
    #[arg(long, env = "INPUT_PHONE-HOME", hide_env_values = true)]
    pub phone_home: Option<String>,

    /// Status state: pending, success, error, or failure.
    #[arg(long, env = "INPUT_STATE")]
    pub state: Option<String>,

    /// Short description shown next to the status.
    #[arg(long, env = "INPUT_DESCRIPTION")]
    pub description: Option<String>,

    /// Link shown next to the status.
    #[arg(long, env = "INPUT_TARGET-URL")]
    pub target_url: Option<String>,
}

impl ReportArgs {
    pub fn into_report(self) -> Result<PhoneHomeReport, RelayError> {
        let phone_home = non_blank(self.phone_home)
            .ok_or_else(|| RelayError::configuration("missing required input: phone-home"))?;
        let state = non_blank(self.state)
            .ok_or_else(|| RelayError::configuration("missing required input: state"))?
            .parse::<StatusState>()
            .map_err(|e| RelayError::configuration(e.to_string()))?;

        Ok(PhoneHomeReport {
            address: ReturnAddress::decode(&phone_home)?,
            state,
            description: non_blank(self.description).unwrap_or_default(),
            target_url: non_blank(self.target_url),
        })
    }
}

/// HTTP client settings shared by both flows.
#[derive(Debug, Default, Args)]
pub struct ClientArgs {
    /// GitHub API base URL.
    #[arg(long, env = "INPUT_API-URL", global = true)]
    pub api_url: Option<String>,

    /// API URL of the runner's GitHub instance, used when `api-url` is unset.
    #[arg(long, env = "GITHUB_API_URL", hide = true, global = true)]
    pub github_api_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "INPUT_REQUEST-TIMEOUT-SECS", global = true)]
    pub request_timeout_secs: Option<String>,

    /// How often to resend a request whose connection could not be opened.
    #[arg(long, env = "INPUT_TRANSPORT-RETRIES", global = true)]
    pub transport_retries: Option<String>,
}

impl ClientArgs {
    pub fn into_settings(self) -> Result<ClientSettings, RelayError> {
        let defaults = ClientSettings::default();

        let api_url = non_blank(self.api_url)
            .or_else(|| non_blank(self.github_api_url))
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let request_timeout = match non_blank(self.request_timeout_secs) {
            Some(secs) => match parse_number(&secs, "request-timeout-secs")? {
                0 => {
                    return Err(RelayError::configuration(
                        "request-timeout-secs must be greater than zero",
                    ))
                }
                secs => Duration::from_secs(secs),
            },
            None => defaults.request_timeout,
        };
        let transport_retries = match non_blank(self.transport_retries) {
            Some(n) => parse_number(&n, "transport-retries")?,
            None => defaults.transport_retries,
        };

        Ok(ClientSettings {
            api_url,
            request_timeout,
            transport_retries,
            ..defaults
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, RelayError> {
    value.parse().map_err(|_| {
        RelayError::configuration(format!(
            "{name} must be a non-negative integer, got '{value}'"
        ))
    })
}
