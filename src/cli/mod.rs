mod commands;
pub mod exit_codes;
mod output;

pub use commands::{exit_code_for, report_error, Cli, Commands, ConfigCommands};
pub use output::OutputMode;

use anyhow::Result;

pub fn run(cli: Cli) -> Result<()> {
    commands::execute(cli)
}
