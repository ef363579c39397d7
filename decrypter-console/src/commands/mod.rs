//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod solve;
mod status;

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a ciphertext and follow the job until it settles
    Solve {
        /// Ciphertext; read from --file or stdin when omitted
        text: Option<String>,

        /// Read the ciphertext from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<std::path::PathBuf>,

        /// Seed for the solver's random search
        #[arg(long)]
        seed: Option<i64>,
    },
    /// Show the current state of a task once
    Status {
        /// Task ID returned by the service
        task_id: String,

        /// Print the raw snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<ExitCode> {
    match command {
        Commands::Solve { text, file, seed } => solve::handle_solve(text, file, seed, config).await,
        Commands::Status { task_id, json } => status::handle_status(&task_id, json, config).await,
    }
}
