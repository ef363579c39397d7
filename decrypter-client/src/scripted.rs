//! Scripted in-memory solver service
//!
//! Replays prepared answers instead of talking HTTP and records how it was
//! called. The last scripted fetch answer repeats once the script runs out.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use decrypter_core::domain::task::Job;
use decrypter_core::dto::task::{SolveRequest, TaskSnapshot};

use crate::error::{ClientError, Result};
use crate::{SolverApi, validate_cipher_text};

/// Scripted answer to a `submit` call
#[derive(Debug, Clone)]
pub enum SubmitStep {
    Accept(Job),
    TransportFailure(String),
}

/// Scripted answer to a `fetch_status` call
#[derive(Debug, Clone)]
pub enum FetchStep {
    Snapshot(TaskSnapshot),
    TransportFailure(String),
    /// Non-success HTTP status with the given message
    HttpStatus(u16, String),
    NotFound,
}

pub struct ScriptedApi {
    submits: Mutex<VecDeque<SubmitStep>>,
    fetches: Mutex<VecDeque<FetchStep>>,
    submit_delay: Duration,
    fetch_delay: Duration,
    submitted: Mutex<Vec<SolveRequest>>,
    fetched: Mutex<Vec<Job>>,
    submit_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedApi {
    /// Accepts every submission as `t1`, `t2`, ... and reports them running
    pub fn new() -> Self {
        Self {
            submits: Mutex::new(VecDeque::new()),
            fetches: Mutex::new(VecDeque::new()),
            submit_delay: Duration::ZERO,
            fetch_delay: Duration::ZERO,
            submitted: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
            submit_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_submits(self, steps: Vec<SubmitStep>) -> Self {
        *self.submits.lock().unwrap() = steps.into();
        self
    }

    pub fn with_fetches(self, steps: Vec<FetchStep>) -> Self {
        *self.fetches.lock().unwrap() = steps.into();
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    /// Jobs passed to `fetch_status`, in call order
    pub fn fetched_jobs(&self) -> Vec<Job> {
        self.fetched.lock().unwrap().clone()
    }

    /// Requests that passed validation, in call order
    pub fn submitted(&self) -> Vec<SolveRequest> {
        self.submitted.lock().unwrap().clone()
    }

    /// Highest number of fetches that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_fetch(&self) -> FetchStep {
        let mut fetches = self.fetches.lock().unwrap();
        if fetches.len() > 1 {
            fetches.pop_front().unwrap_or(FetchStep::NotFound)
        } else {
            fetches
                .front()
                .cloned()
                .unwrap_or_else(|| FetchStep::Snapshot(TaskSnapshot::running(Vec::new())))
        }
    }
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SolverApi for ScriptedApi {
    async fn submit(&self, cipher_text: &str, seed: Option<i64>) -> Result<Job> {
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        validate_cipher_text(cipher_text)?;

        self.submitted.lock().unwrap().push(SolveRequest {
            cipher: cipher_text.to_string(),
            seed,
        });
        let step = self.submits.lock().unwrap().pop_front();

        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }

        match step {
            None => Ok(Job::new(format!("t{}", call))),
            Some(SubmitStep::Accept(job)) => Ok(job),
            Some(SubmitStep::TransportFailure(message)) => Err(ClientError::api_error(503, message)),
        }
    }

    async fn fetch_status(&self, job: &Job) -> Result<TaskSnapshot> {
        self.fetched.lock().unwrap().push(job.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let step = self.next_fetch();

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        match step {
            FetchStep::Snapshot(snapshot) => Ok(snapshot),
            FetchStep::TransportFailure(message) => Err(ClientError::api_error(503, message)),
            FetchStep::HttpStatus(status, message) => Err(ClientError::api_error(status, message)),
            FetchStep::NotFound => Err(ClientError::NotFound(job.to_string())),
        }
    }
}
