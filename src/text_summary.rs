//! Text summary builder for CLI output.
//!
//! Formats the human-readable outcome lines for text mode.

use crate::model::{InvocationReport, Outcome};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Line announcing the command before it is spawned.
pub(crate) fn command_line(command: &str) -> String {
    format!("Running the following command: {command}")
}

/// Line announcing the child PID.
pub(crate) fn pid_line(pid: u32) -> String {
    format!("Started process with PID: {pid}")
}

/// Build the closing summary for a finished (or dry) run.
pub(crate) fn build_text_summary(report: &InvocationReport) -> TextSummary {
    let mut lines = Vec::new();

    if report.dry_run {
        lines.push(format!(
            "Dry run: selected {} run ids, command not executed",
            report.run_ids.len()
        ));
        return TextSummary { lines };
    }

    let command = &report.command;
    match report.outcome {
        Outcome::Success => lines.push(format!("Command '{command}' executed successfully")),
        Outcome::Failed { code } => lines.push(format!(
            "Command '{command}' failed with return code {code}"
        )),
        Outcome::Signaled => lines.push(format!(
            "Command '{command}' failed: terminated by signal"
        )),
        Outcome::NotStarted => lines.push(format!("Command '{command}' was not started")),
    }
    lines.push(format!(
        "Run ids: {}  Elapsed: {}",
        report.run_ids.len(),
        humantime::format_duration(round_to_millis(report.elapsed))
    ));
    if let Some(out) = report.out_file.as_deref() {
        lines.push(format!("Output written to: {}", out.display()));
    }

    TextSummary { lines }
}

fn round_to_millis(d: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(d.as_millis() as u64)
}
