//! Terminal rendering of the job view

use chrono::Local;
use colored::*;
use decrypter_core::domain::log::LogEntry;
use decrypter_core::domain::task::{JobStatus, SolveOutcome, SolvedText};

use crate::controller::{JobView, Phase};

/// Prints log lines that arrived since the last call
///
/// Snapshots replace the whole log, so the tail only remembers how many
/// lines it has already printed.
#[derive(Debug, Default)]
pub struct LogTail {
    printed: usize,
}

impl LogTail {
    pub fn print_new(&mut self, logs: &[LogEntry]) {
        for entry in self.take_new(logs) {
            print_log_entry(entry);
        }
    }

    fn take_new<'a>(&mut self, logs: &'a [LogEntry]) -> &'a [LogEntry] {
        if logs.len() < self.printed {
            self.printed = 0;
        }
        let new = &logs[self.printed..];
        self.printed = logs.len();
        new
    }
}

/// `[HH:MM:SS] message`, local time like the service's own console
pub fn format_log_line(entry: &LogEntry) -> String {
    let time = entry
        .time()
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    format!("[{}] {}", time, entry.message)
}

pub fn format_score(score: f64) -> String {
    format!("{:.3}", score)
}

pub fn format_key(key: &[String]) -> String {
    key.join(" ")
}

fn print_log_entry(entry: &LogEntry) {
    let line = format_log_line(entry);
    match line.split_once("] ") {
        Some((time, message)) => println!("{}] {}", time.dimmed(), message),
        None => println!("{}", line),
    }
}

/// Prints the final block for a settled view
pub fn print_view_summary(view: &JobView) {
    println!("{}", "─".repeat(80).dimmed());
    println!("  Status: {}", colorize_phase(view.phase));
    if let Some(job) = &view.job {
        println!("  Task:   {}", job.to_string().dimmed());
    }
    if let Some(outcome) = &view.outcome {
        println!();
        print_outcome(outcome);
    }
}

pub fn print_outcome(outcome: &SolveOutcome) {
    match outcome {
        SolveOutcome::Failed { error } => {
            println!("{} {}", "Error:".red().bold(), error.red());
        }
        SolveOutcome::Solved(text) => print_solved(text),
    }
}

fn print_solved(text: &SolvedText) {
    println!("{}", "Plaintext (segmented):".bold());
    println!("  {}", text.plaintext.green());
    println!();
    println!("{}", "Raw plaintext:".bold());
    println!("  {}", text.raw_plaintext);
    println!();
    println!("  Score:        {}", format_score(text.score).cyan());
    println!("  Key:          {}", format_key(&text.key));
    if let Some(guess) = &text.caesar_guess {
        println!("  Caesar guess: {}", guess.dimmed());
    }

    let mapping = text.key_mapping();
    if !mapping.is_empty() {
        println!();
        println!("{}", "Substitution:".bold());
        let pairs: Vec<String> = mapping
            .iter()
            .map(|(plain, symbol)| format!("{}→{}", plain, symbol))
            .collect();
        for row in pairs.chunks(13) {
            println!("  {}", row.join("  "));
        }
    }
}

pub fn colorize_phase(phase: Phase) -> ColoredString {
    let s = format!("{:?}", phase);
    match phase {
        Phase::Idle => s.dimmed(),
        Phase::Running => s.cyan(),
        Phase::Done => s.green(),
        Phase::Error => s.red(),
    }
}

pub fn colorize_status(status: JobStatus) -> ColoredString {
    colorize_phase(status.into())
}
