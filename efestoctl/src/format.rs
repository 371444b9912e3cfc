//! Output formatting for the CLI
//!
//! The report is a single human-readable line: the device-state payload for a
//! successful `get_state`, the outcome's state label or message otherwise.

use efesto_core::Outcome;

use crate::cli::Command;

/// Render the report line for an outcome.
///
/// `command` is `None` when the command name never resolved to an operation
/// (unsupported command, bad argument).
pub fn render_outcome(command: Option<&Command>, outcome: &Outcome) -> String {
    match (command, outcome) {
        (Some(Command::GetState), Outcome::Ok { data: Some(data) }) => data.clone(),
        _ => outcome.state_label().to_string(),
    }
}

/// Process exit code for an outcome: 0 only for success, 1 for every error
/// state.
pub fn exit_code(outcome: &Outcome) -> i32 {
    if outcome.is_ok() {
        0
    } else {
        1
    }
}
