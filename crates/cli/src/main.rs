//! Workflow relay entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: read the action inputs (`INPUT_*`) or flags
//!    and validate them into a [`relay::RelayConfig`].
//! 2. **Wire observability**: configure `tracing-subscriber` (text or JSON)
//!    with an env filter; `RUNNER_DEBUG=1` turns on debug output.
//! 3. **Construct infrastructure**: build the [`github::GithubClient`] and
//!    inject it into [`relay::RelayExecutor`].
//! 4. **Select the flow**: dispatch (default) or `report`.
//!
//! Any failure is printed as an `::error::` annotation and the process exits
//! with a failure status.

mod args;
mod console;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use github::GithubClient;
use relay::{report_via_phone_home, RelayExecutor};
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Command, LogFormat};
use crate::console::ActionsConsole;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = format!("{err:#}"), "relay failed");
            println!("{}", console::error_annotation(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.client.into_settings()?;
    let client = GithubClient::new(settings).context("cannot create GitHub client")?;

    match cli.command {
        None | Some(Command::Dispatch) => {
            let config = cli.dispatch.into_config()?;
            let executor = RelayExecutor::new(client.clone(), client, ActionsConsole);
            let receipt = executor.execute(&config).await?;
            tracing::info!(
                invocation = %receipt.invocation,
                reported_at = %receipt.reported_at,
                "dispatched"
            );
        }
        Some(Command::Report(args)) => {
            let report = args.into_report()?;
            report_via_phone_home(&client, &ActionsConsole, &report).await?;
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let default_level = if std::env::var("RUNNER_DEBUG").is_ok_and(|v| v == "1") {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
