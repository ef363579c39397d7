//! Task domain types

use serde::{Deserialize, Serialize};

/// Handle of a submitted solving task
///
/// Opaque to the front end; the service picks the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Job(String);

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by the service for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Done,
    Error,
}

impl JobStatus {
    /// Done and Error are final; nothing may follow them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// A successfully decrypted text
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedText {
    /// Plaintext split into words
    pub plaintext: String,
    /// Plaintext as a single run of letters
    pub raw_plaintext: String,
    pub score: f64,
    /// Substitution key, one symbol per alphabet position
    pub key: Vec<String>,
    /// Best Caesar shift the service tried before the full search
    pub caesar_guess: Option<String>,
}

impl SolvedText {
    /// Pairs each alphabet letter with the symbol it maps to in the key
    pub fn key_mapping(&self) -> Vec<(char, &str)> {
        ('a'..='z')
            .zip(self.key.iter().map(String::as_str))
            .collect()
    }
}

/// Final outcome of a task
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Solved(SolvedText),
    Failed { error: String },
}

impl SolveOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SolveOutcome::Failed { error } => Some(error),
            SolveOutcome::Solved(_) => None,
        }
    }

    pub fn solved(&self) -> Option<&SolvedText> {
        match self {
            SolveOutcome::Solved(text) => Some(text),
            SolveOutcome::Failed { .. } => None,
        }
    }
}
