//! Task DTOs

use serde::{Deserialize, Serialize};

use crate::domain::log::LogEntry;
use crate::domain::task::{Job, JobStatus, SolveOutcome, SolvedText};

/// Body of `POST /solve`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    pub cipher: String,
    pub seed: Option<i64>,
}

/// Response of `POST /solve`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCreated {
    pub task_id: Job,
}

/// Raw result record as sent by the service
///
/// Success and failure share one object on the wire; which one it is depends
/// on whether `error` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskResult {
    pub plaintext: Option<String>,
    pub raw_plaintext: Option<String>,
    pub score: Option<f64>,
    pub key: Option<Vec<String>>,
    pub caesar_guess: Option<String>,
    pub error: Option<String>,
}

/// Response of `GET /tasks/{task_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub status: JobStatus,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub result: Option<TaskResult>,
}

/// Either a snapshot or the service's `{"error": "not_found"}` reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TaskLookup {
    Found(TaskSnapshot),
    Missing { error: String },
}

const MISSING_ERROR_DETAILS: &str = "remote reported an error without details";
const MISSING_RESULT: &str = "remote reported completion without a result";

impl TaskSnapshot {
    pub fn running(logs: Vec<LogEntry>) -> Self {
        Self {
            status: JobStatus::Running,
            logs,
            result: None,
        }
    }

    /// Final outcome carried by this snapshot
    ///
    /// `None` while the task is running, `Some` once it is done or failed,
    /// whatever the service put in `result`.
    pub fn outcome(&self) -> Option<SolveOutcome> {
        if !self.status.is_terminal() {
            return None;
        }

        let Some(result) = &self.result else {
            return Some(SolveOutcome::failed(match self.status {
                JobStatus::Error => MISSING_ERROR_DETAILS,
                _ => MISSING_RESULT,
            }));
        };

        if let Some(error) = &result.error {
            return Some(SolveOutcome::failed(error.clone()));
        }

        if self.status == JobStatus::Error {
            return Some(SolveOutcome::failed(MISSING_ERROR_DETAILS));
        }

        let solved = match (&result.plaintext, &result.raw_plaintext, result.score) {
            (Some(plaintext), Some(raw_plaintext), Some(score)) => SolvedText {
                plaintext: plaintext.clone(),
                raw_plaintext: raw_plaintext.clone(),
                score,
                key: result.key.clone().unwrap_or_default(),
                caesar_guess: result.caesar_guess.clone(),
            },
            _ => return Some(SolveOutcome::failed(MISSING_RESULT)),
        };

        Some(SolveOutcome::Solved(solved))
    }
}
