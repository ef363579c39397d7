//! Solve command handler
//!
//! Submits a ciphertext, streams progress lines while the job runs and
//! prints the result once it settles.

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::*;
use decrypter_client::SolverClient;
use tracing::debug;

use crate::config::Config;
use crate::controller::{JobController, Phase};
use crate::render::{LogTail, print_view_summary};

/// Exit status after Ctrl-C, as shells report it
const INTERRUPTED: u8 = 130;

pub async fn handle_solve(
    text: Option<String>,
    file: Option<PathBuf>,
    seed: Option<i64>,
    config: &Config,
) -> Result<ExitCode> {
    let cipher_text = read_cipher_text(text, file)?;

    let client = SolverClient::with_client(&config.api_base, config.http_client()?);
    let mut controller = JobController::new(Arc::new(client), config.poll_interval)
        .with_fetch_timeout(config.request_timeout);

    if !controller.view().can_start(&cipher_text) {
        println!("{}", "Nothing to solve: the ciphertext is empty.".yellow());
        return Ok(ExitCode::FAILURE);
    }

    if let Err(e) = controller.start(&cipher_text, seed) {
        debug!("Start rejected: {}", e);
        print_view_summary(controller.view());
        return Ok(ExitCode::FAILURE);
    }

    println!(
        "{}",
        format!(
            "Solving {} character(s) via {}...",
            cipher_text.chars().count(),
            config.api_base
        )
        .bold()
    );

    if follow_job(&mut controller, tokio::signal::ctrl_c()).await == Followed::Interrupted {
        println!("{}", "Cancelled. The service may keep working on the task.".yellow());
        return Ok(ExitCode::from(INTERRUPTED));
    }

    let view = controller.view();
    print_view_summary(view);

    let solved = view.phase == Phase::Done
        && view.outcome.as_ref().is_some_and(|o| o.solved().is_some());
    Ok(if solved {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// How [`follow_job`] stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Followed {
    Settled,
    Interrupted,
}

/// Drives the controller until the job settles, printing progress as it goes
///
/// `interrupt` is polled for the whole run, so it resolving between two
/// events still stops the job. On interrupt the controller is reset.
async fn follow_job<F: Future>(controller: &mut JobController, interrupt: F) -> Followed {
    let mut tail = LogTail::default();
    let mut announced = false;
    let mut last_warning: Option<String> = None;

    tokio::pin!(interrupt);

    while controller.view().phase == Phase::Running {
        tokio::select! {
            event = controller.next_event() => {
                let Some(event) = event else { break };
                controller.handle(event);
            }
            _ = &mut interrupt => {
                controller.reset();
                return Followed::Interrupted;
            }
        }

        let view = controller.view();

        if !announced {
            if let Some(job) = &view.job {
                println!("  Task {}", job.to_string().dimmed());
                announced = true;
            }
        }

        tail.print_new(&view.logs);

        if view.poll_warning != last_warning {
            if let Some(warning) = &view.poll_warning {
                eprintln!("{} {}", "⚠".yellow(), warning.yellow());
            }
            last_warning = view.poll_warning.clone();
        }
    }

    Followed::Settled
}

/// Argument, file or stdin, in that order
fn read_cipher_text(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }

    let raw = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read ciphertext from {}", path.display()))?,
        None => {
            let mut stdin = std::io::stdin();
            if stdin.is_terminal() {
                eprintln!("{}", "Paste the ciphertext, then press Ctrl-D:".dimmed());
            }
            let mut buf = String::new();
            stdin
                .read_to_string(&mut buf)
                .context("Failed to read ciphertext from stdin")?;
            buf
        }
    };

    Ok(strip_line_ending(raw))
}

fn strip_line_ending(mut text: String) -> String {
    let len = text.trim_end_matches(['\n', '\r']).len();
    text.truncate(len);
    text
}
