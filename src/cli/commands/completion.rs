//! Completion command - print a shell completion script

use crate::cli::args::{Cli, CompletionArgs};
use crate::error::ForgeResult;
use clap::CommandFactory;

/// Execute the completion command
pub fn execute(args: CompletionArgs) -> ForgeResult<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(args.shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}
