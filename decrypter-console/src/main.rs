//! Decrypter Console
//!
//! Terminal front end for the remote cipher solver: submits a ciphertext,
//! follows the task while it runs and prints the decryption.

mod commands;
mod config;
mod controller;
mod render;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "decrypter")]
#[command(about = "Substitution cipher solver console", long_about = None)]
struct Cli {
    /// Solver service URL
    #[arg(long, env = "DECRYPTER_API_BASE", default_value = "http://localhost:8000")]
    api_base: String,

    /// Milliseconds between two status polls
    #[arg(long, env = "DECRYPTER_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Seconds before a single request is abandoned
    #[arg(long, env = "DECRYPTER_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Diagnostics go to stderr so they never mix with rendered output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "decrypter=warn,decrypter_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        api_base: cli.api_base,
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
        request_timeout: Duration::from_secs(cli.request_timeout_secs),
    };
    config.validate()?;

    handle_command(cli.command, &config).await
}
