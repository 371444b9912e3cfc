//! Command execution handlers

use anyhow::Result;
use efesto_core::Outcome;

use crate::client::EfestoClient;
use crate::config::CliConfig;
use crate::format::{exit_code, render_outcome};

use super::commands::Command;

/// Parse and run the requested command, print the report line, and return the
/// process exit code.
///
/// A command name that doesn't resolve to an operation is reported as an error
/// outcome without any network activity.
pub async fn handle_command(
    config: CliConfig,
    name: &str,
    argument: Option<&str>,
) -> Result<i32> {
    let command = match Command::parse(name, argument) {
        Ok(command) => command,
        Err(e) => {
            let outcome = Outcome::error(e.to_string());
            println!("{}", render_outcome(None, &outcome));
            return Ok(exit_code(&outcome));
        }
    };

    let mut client = EfestoClient::new(config)?;
    let outcome = client.run(&command).await?;

    println!("{}", render_outcome(Some(&command), &outcome));
    Ok(exit_code(&outcome))
}
