//! Task poller
//!
//! Fetches the status of one task at a fixed period and forwards every
//! snapshot to the owner through a channel. At most one poll task runs per
//! [`Poller`]; fetches are serialized because the next tick is only awaited
//! after the previous fetch has finished or timed out.

use std::sync::Arc;

use decrypter_core::domain::task::Job;
use decrypter_core::dto::task::TaskSnapshot;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::SolverApi;
use crate::error::ClientError;

/// Default period between two status fetches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default upper bound for a single status fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Message sent by the poll task
#[derive(Debug)]
pub enum PollEvent {
    /// Latest snapshot, sent on every successful tick
    Update { job: Job, snapshot: TaskSnapshot },
    /// The task reached done or error; the timer is already stopped
    Settled { job: Job },
    /// One tick failed; polling continues at the next tick
    TickFailed {
        job: Job,
        error: ClientError,
        consecutive: u32,
    },
    /// The service no longer knows the task; polling has stopped
    Lost { job: Job, error: ClientError },
}

impl PollEvent {
    pub fn job(&self) -> &Job {
        match self {
            PollEvent::Update { job, .. }
            | PollEvent::Settled { job }
            | PollEvent::TickFailed { job, .. }
            | PollEvent::Lost { job, .. } => job,
        }
    }
}

/// Owner of the single recurring poll task
pub struct Poller<A: ?Sized> {
    api: Arc<A>,
    fetch_timeout: Duration,
    handle: Option<JoinHandle<()>>,
}

impl<A: SolverApi + ?Sized + 'static> Poller<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            handle: None,
        }
    }

    /// Bounds how long a tick waits on a single fetch
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Starts polling `job` every `interval`
    ///
    /// Any poll task already running is cancelled first. The first fetch
    /// happens one `interval` after this call.
    pub fn start_polling<E>(&mut self, job: Job, interval: Duration, sink: UnboundedSender<E>)
    where
        E: From<PollEvent> + Send + 'static,
    {
        self.cancel_polling();

        info!("Polling task {} every {:?}", job, interval);

        let api = Arc::clone(&self.api);
        let fetch_timeout = self.fetch_timeout;
        self.handle = Some(tokio::spawn(poll_task(
            api,
            job,
            interval,
            fetch_timeout,
            sink,
        )));
    }

    /// Stops the poll task, if any
    pub fn cancel_polling(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                debug!("Cancelling active poll task");
            }
            handle.abort();
        }
    }

    /// True while a poll task exists and has not finished
    pub fn is_polling(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<A: ?Sized> Drop for Poller<A> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn poll_task<A, E>(
    api: Arc<A>,
    job: Job,
    interval: Duration,
    fetch_timeout: Duration,
    sink: UnboundedSender<E>,
) where
    A: SolverApi + ?Sized,
    E: From<PollEvent>,
{
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut tick: u64 = 0;
    let mut consecutive_failures: u32 = 0;

    loop {
        ticker.tick().await;
        tick += 1;

        debug!("Fetching status of task {} (tick {})", job, tick);

        let fetched = match time::timeout(fetch_timeout, api.fetch_status(&job)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(fetch_timeout)),
        };

        let event = match fetched {
            Ok(snapshot) => {
                consecutive_failures = 0;
                let settled = snapshot.status.is_terminal();
                let status = snapshot.status;

                if sink
                    .send(PollEvent::Update {
                        job: job.clone(),
                        snapshot,
                    }
                    .into())
                    .is_err()
                {
                    debug!("Poll receiver for task {} dropped, stopping", job);
                    return;
                }

                if !settled {
                    continue;
                }

                info!("Task {} settled with status {} after {} tick(s)", job, status, tick);
                PollEvent::Settled { job }
            }
            Err(error @ ClientError::NotFound(_)) => {
                warn!("Task {} is unknown to the service, stopping: {}", job, error);
                PollEvent::Lost { job, error }
            }
            Err(error) => {
                consecutive_failures += 1;
                warn!(
                    "Status fetch for task {} failed ({} in a row): {}",
                    job, consecutive_failures, error
                );

                if sink
                    .send(
                        PollEvent::TickFailed {
                            job: job.clone(),
                            error,
                            consecutive: consecutive_failures,
                        }
                        .into(),
                    )
                    .is_err()
                {
                    return;
                }
                continue;
            }
        };

        // Terminal: the timer goes away before the owner hears about it
        drop(ticker);
        let _ = sink.send(event.into());
        return;
    }
}
