use std::io::IsTerminal;

use cli_table::{Cell, Style, Table, format::Justify, print_stdout};
use owo_colors::OwoColorize;

use crate::transfer::{RunSummary, Stage, TransferOutcome};

/// Try to enable ANSI escape sequence support on Windows consoles.
/// Returns true if enabling succeeded (or platform likely already supports ANSI), false otherwise.
#[cfg(windows)]
pub fn try_enable_ansi_on_windows() -> bool {
    enable_ansi_support::enable_ansi_support().is_ok()
}

// ANSI is available by default in terminals on other platforms
#[cfg(not(windows))]
pub fn try_enable_ansi_on_windows() -> bool {
    true
}

fn use_color() -> bool {
    std::io::stdout().is_terminal() && try_enable_ansi_on_windows()
}

/// Print one row per file with its stage and error, if any.
pub fn print_outcome_table(outcomes: &[TransferOutcome]) -> std::io::Result<()> {
    if outcomes.is_empty() {
        println!("No matching files; nothing was transferred.");
        return Ok(());
    }
    let title = vec!["File".cell().bold(true), "Stage".cell().bold(true), "Error".cell().bold(true)];
    let rows: Vec<_> = outcomes
        .iter()
        .map(|o| {
            vec![
                o.filename.as_str().cell(),
                o.stage.to_string().cell().justify(Justify::Right),
                o.error.as_deref().unwrap_or("").cell(),
            ]
        })
        .collect();
    print_stdout(rows.table().title(title))
}

/// One summary line below the table, coloured per stage when stdout is a terminal.
pub fn print_summary(summary: &RunSummary) {
    let ok = format!("{}: {}", Stage::Relocated, summary.relocated);
    let up = format!("{}: {}", Stage::FailedUpload, summary.failed_upload);
    let mv = format!("{}: {}", Stage::FailedRelocate, summary.failed_relocate);
    if use_color() {
        println!("{}    {}    {}", ok.green(), up.red(), mv.yellow());
    } else {
        println!("{}    {}    {}", ok, up, mv);
    }
}

/// Single-line JSON for scripts: outcomes plus the summary.
pub fn outcomes_json(outcomes: &[TransferOutcome]) -> serde_json::Value {
    serde_json::json!({
        "summary": crate::transfer::summarize(outcomes),
        "outcomes": outcomes,
    })
}
