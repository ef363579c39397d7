//! Status command handler

use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::*;
use decrypter_client::{Job, SolverApi, SolverClient};

use crate::config::Config;
use crate::render::{LogTail, colorize_status, print_outcome};

/// Fetch and display one snapshot of a task
pub async fn handle_status(task_id: &str, json: bool, config: &Config) -> Result<ExitCode> {
    let client = SolverClient::with_client(&config.api_base, config.http_client()?);
    let job = Job::new(task_id);

    let snapshot = match client.fetch_status(&job).await {
        Ok(snapshot) => snapshot,
        Err(e) if e.is_not_found() => {
            println!("{}", format!("Task {} not found.", job).yellow());
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("Failed to fetch task status"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "Task Details:".bold());
    println!("  ID:     {}", job.to_string().cyan());
    println!("  Status: {}", colorize_status(snapshot.status));
    println!("  Logs:   {}", snapshot.logs.len());

    if !snapshot.logs.is_empty() {
        println!("{}", "─".repeat(80).dimmed());
        LogTail::default().print_new(&snapshot.logs);
        println!("{}", "─".repeat(80).dimmed());
    }

    if let Some(outcome) = snapshot.outcome() {
        println!();
        print_outcome(&outcome);
    }

    Ok(ExitCode::SUCCESS)
}
