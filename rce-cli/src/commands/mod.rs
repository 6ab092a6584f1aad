//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod exec;

pub use exec::ExecArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a command remotely and stream its output
    Exec(ExecArgs),
}

/// Handle a CLI command
///
/// # Returns
/// The process exit code to finish with
pub async fn handle_command(command: Commands, config: &Config) -> Result<i32> {
    match command {
        Commands::Exec(args) => exec::handle_exec_command(args, config).await,
    }
}
