//! GitHub Actions workflow-command output.
//!
//! The runner scans stdout for lines of the form `::command::data`. Group
//! markers fold each phase of a run into a collapsible section; masks keep
//! secrets out of the log; `::error::` lines surface as annotations on the
//! job summary.

use relay::Console;

/// [`Console`] that writes workflow commands to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionsConsole;

impl Console for ActionsConsole {
    fn mask(&self, secret: &str) {
        for line in mask_commands(secret) {
            println!("{line}");
        }
    }

    fn open_group(&self, title: &str) {
        println!("::group::{}", escape_data(title));
    }

    fn close_group(&self) {
        println!("::endgroup::");
    }
}

/// One `::add-mask::` per non-blank line; the runner masks line by line.
fn mask_commands(secret: &str) -> Vec<String> {
    secret
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("::add-mask::{}", escape_data(line)))
        .collect()
}

/// Formats an error chain as an `::error::` annotation.
pub fn error_annotation(err: &anyhow::Error) -> String {
    format!("::error::{}", escape_data(&format!("{err:#}")))
}

/// Escapes workflow-command data so `%` and line breaks survive.
fn escape_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
