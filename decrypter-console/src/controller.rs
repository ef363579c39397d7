//! Job controller
//!
//! Owns the lifecycle of the single active solving job: submits it, hands the
//! returned handle to the poller, applies every snapshot to the view-model
//! and stops polling once the job settles. The submit and poll tasks only
//! talk back through the controller's event channel, and every event is
//! checked against the current attempt or job before it is applied.

use std::sync::Arc;
use std::time::Duration;

use decrypter_client::{ClientError, PollEvent, Poller, SolverApi, validate_cipher_text};
use decrypter_core::domain::log::LogEntry;
use decrypter_core::domain::task::{Job, JobStatus, SolveOutcome};
use decrypter_core::dto::task::TaskSnapshot;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Lifecycle phase of the controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Done,
    Error,
}

impl Phase {
    pub fn is_settled(self) -> bool {
        matches!(self, Phase::Done | Phase::Error)
    }
}

impl From<JobStatus> for Phase {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Running => Phase::Running,
            JobStatus::Done => Phase::Done,
            JobStatus::Error => Phase::Error,
        }
    }
}

/// What the presentation layer renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobView {
    pub phase: Phase,
    pub job: Option<Job>,
    pub logs: Vec<LogEntry>,
    /// Present only once the job is done or failed
    pub outcome: Option<SolveOutcome>,
    /// Last poll failure; cleared by the next successful snapshot
    pub poll_warning: Option<String>,
}

impl JobView {
    /// Gate for the "solve" action
    pub fn can_start(&self, cipher_text: &str) -> bool {
        !cipher_text.is_empty() && self.phase != Phase::Running
    }
}

/// Message delivered to the controller's event channel
#[derive(Debug)]
pub enum ControllerEvent {
    Submitted {
        attempt: u64,
        outcome: Result<Job, ClientError>,
    },
    Poll(PollEvent),
}

impl From<PollEvent> for ControllerEvent {
    fn from(event: PollEvent) -> Self {
        ControllerEvent::Poll(event)
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("a job is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Rejected(#[from] ClientError),
}

pub struct JobController {
    api: Arc<dyn SolverApi>,
    poller: Poller<dyn SolverApi>,
    poll_interval: Duration,
    /// Bumped by every start and reset; submit replies carry the value they
    /// were issued under
    attempt: u64,
    view: JobView,
    events_tx: UnboundedSender<ControllerEvent>,
    events_rx: UnboundedReceiver<ControllerEvent>,
}

impl JobController {
    pub fn new(api: Arc<dyn SolverApi>, poll_interval: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            poller: Poller::new(Arc::clone(&api)),
            api,
            poll_interval,
            attempt: 0,
            view: JobView::default(),
            events_tx,
            events_rx,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.poller = Poller::new(Arc::clone(&self.api)).with_fetch_timeout(fetch_timeout);
        self
    }

    pub fn view(&self) -> &JobView {
        &self.view
    }

    #[cfg(test)]
    pub fn is_polling(&self) -> bool {
        self.poller.is_polling()
    }

    /// Starts a new job from Idle, Done or Error
    ///
    /// Must be called from within a tokio runtime. Rejected without side
    /// effects while a job is running. Empty input is reported through the
    /// view as well as the returned error, and nothing is sent.
    pub fn start(&mut self, cipher_text: &str, seed: Option<i64>) -> Result<(), ControllerError> {
        if self.view.phase == Phase::Running {
            warn!("Ignoring start request while a job is running");
            return Err(ControllerError::AlreadyRunning);
        }

        self.poller.cancel_polling();
        self.discard_pending();
        self.attempt += 1;
        self.view = JobView::default();

        if let Err(e) = validate_cipher_text(cipher_text) {
            self.view.phase = Phase::Error;
            self.view.outcome = Some(SolveOutcome::failed(e.to_string()));
            return Err(e.into());
        }

        self.view.phase = Phase::Running;

        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();
        let attempt = self.attempt;
        let cipher_text = cipher_text.to_string();

        debug!("Submitting attempt {}", attempt);
        tokio::spawn(async move {
            let outcome = api.submit(&cipher_text, seed).await;
            let _ = events.send(ControllerEvent::Submitted { attempt, outcome });
        });

        Ok(())
    }

    /// Back to Idle from any state
    pub fn reset(&mut self) {
        self.poller.cancel_polling();
        self.discard_pending();
        self.attempt += 1;
        self.view = JobView::default();
        info!("Controller reset");
    }

    /// Waits for the next message from the submit or poll task
    pub async fn next_event(&mut self) -> Option<ControllerEvent> {
        self.events_rx.recv().await
    }

    /// Processes events until the current job is no longer running
    #[cfg(test)]
    pub async fn run_until_settled(&mut self) {
        while self.view.phase == Phase::Running {
            match self.next_event().await {
                Some(event) => self.handle(event),
                None => break,
            }
        }
    }

    pub fn handle(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Submitted { attempt, outcome } => self.on_submitted(attempt, outcome),
            ControllerEvent::Poll(PollEvent::Update { job, snapshot }) => {
                self.on_update(&job, snapshot)
            }
            ControllerEvent::Poll(PollEvent::Settled { job }) => self.on_settled(&job),
            ControllerEvent::Poll(PollEvent::TickFailed {
                job,
                error,
                consecutive,
            }) => self.on_tick_failed(&job, &error, consecutive),
            ControllerEvent::Poll(PollEvent::Lost { job, error }) => self.on_lost(&job, &error),
        }
    }

    fn on_submitted(&mut self, attempt: u64, outcome: Result<Job, ClientError>) {
        if attempt != self.attempt || self.view.phase != Phase::Running {
            debug!("Discarding submit reply of superseded attempt {}", attempt);
            return;
        }

        match outcome {
            Ok(job) => {
                info!("Job {} accepted", job);
                self.view.job = Some(job.clone());
                self.poller
                    .start_polling(job, self.poll_interval, self.events_tx.clone());
            }
            Err(e) => {
                warn!("Submit failed: {}", e);
                self.view.phase = Phase::Error;
                self.view.outcome = Some(SolveOutcome::failed(e.to_string()));
            }
        }
    }

    fn on_update(&mut self, job: &Job, snapshot: TaskSnapshot) {
        if !self.is_current(job) {
            debug!("Discarding snapshot for job {}", job);
            return;
        }

        if snapshot.logs.len() < self.view.logs.len() {
            warn!(
                "Snapshot for job {} has {} log entries, fewer than the {} already shown",
                job,
                snapshot.logs.len(),
                self.view.logs.len()
            );
        }

        let outcome = snapshot.outcome();
        self.view.logs = snapshot.logs;
        self.view.outcome = outcome;
        self.view.poll_warning = None;
        self.view.phase = snapshot.status.into();

        if self.view.phase.is_settled() {
            self.poller.cancel_polling();
        }
    }

    fn on_settled(&mut self, job: &Job) {
        if self.view.job.as_ref() != Some(job) {
            return;
        }
        self.poller.cancel_polling();
        debug!("Polling for job {} finished", job);
    }

    fn on_tick_failed(&mut self, job: &Job, error: &ClientError, consecutive: u32) {
        if !self.is_current(job) {
            return;
        }
        self.view.poll_warning = Some(format!(
            "status poll failed ({} in a row): {}",
            consecutive, error
        ));
    }

    fn on_lost(&mut self, job: &Job, error: &ClientError) {
        if !self.is_current(job) {
            return;
        }
        self.poller.cancel_polling();
        self.view.phase = Phase::Error;
        self.view.outcome = Some(SolveOutcome::failed(error.to_string()));
    }

    /// Running job whose handle matches; settled jobs accept nothing more
    fn is_current(&self, job: &Job) -> bool {
        self.view.phase == Phase::Running && self.view.job.as_ref() == Some(job)
    }

    fn discard_pending(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            debug!("Dropping stale event {:?}", event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decrypter_client::scripted::{FetchStep, ScriptedApi, SubmitStep};
    use decrypter_core::dto::task::TaskResult;

    const INTERVAL: Duration = Duration::from_millis(1000);

    fn controller(api: &Arc<ScriptedApi>) -> JobController {
        JobController::new(api.clone(), INTERVAL)
    }

    fn running(messages: &[&str]) -> FetchStep {
        FetchStep::Snapshot(TaskSnapshot::running(logs(messages)))
    }

    fn logs(messages: &[&str]) -> Vec<LogEntry> {
        messages
            .iter()
            .enumerate()
            .map(|(i, msg)| LogEntry::new((i + 1) as f64, *msg))
            .collect()
    }

    fn hello_done(messages: &[&str]) -> FetchStep {
        FetchStep::Snapshot(TaskSnapshot {
            status: JobStatus::Done,
            logs: logs(messages),
            result: Some(TaskResult {
                plaintext: Some("HELLO".to_string()),
                raw_plaintext: Some("HELLO".to_string()),
                score: Some(0.92),
                key: Some(vec!["A".to_string(), "B".to_string(), "C".to_string()]),
                ..Default::default()
            }),
        })
    }

    async fn step(controller: &mut JobController) {
        let event = controller.next_event().await.unwrap();
        controller.handle(event);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_submits_once_and_polls() {
        let api = Arc::new(ScriptedApi::new());
        let mut controller = controller(&api);

        controller.start("KHOOR", Some(3)).unwrap();
        assert_eq!(controller.view().phase, Phase::Running);
        assert!(controller.view().job.is_none());

        step(&mut controller).await;
        assert_eq!(controller.view().job, Some(Job::new("t1")));
        assert!(controller.is_polling());
        assert_eq!(api.submit_calls(), 1);
        assert_eq!(api.submitted()[0].seed, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_is_rejected() {
        let api = Arc::new(ScriptedApi::new());
        let mut controller = controller(&api);

        controller.start("KHOOR", None).unwrap();
        let before = controller.view().clone();
        assert!(matches!(
            controller.start("OTHER", None),
            Err(ControllerError::AlreadyRunning)
        ));
        assert_eq!(controller.view(), &before);

        step(&mut controller).await;
        assert!(matches!(
            controller.start("OTHER", None),
            Err(ControllerError::AlreadyRunning)
        ));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(api.submit_calls(), 1);
        assert_eq!(api.submitted()[0].cipher, "KHOOR");
        assert!(api.fetched_jobs().iter().all(|job| job.as_str() == "t1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_khoor_scenario() {
        let api = Arc::new(ScriptedApi::new().with_fetches(vec![
            running(&["trying key A"]),
            hello_done(&["trying key A", "found"]),
        ]));
        let mut controller = controller(&api);

        controller.start("KHOOR", Some(3)).unwrap();
        step(&mut controller).await; // submitted
        step(&mut controller).await; // first poll

        assert_eq!(controller.view().phase, Phase::Running);
        assert_eq!(controller.view().logs.len(), 1);
        assert!(controller.view().outcome.is_none());

        controller.run_until_settled().await;

        let view = controller.view();
        assert_eq!(view.phase, Phase::Done);
        assert_eq!(view.logs.len(), 2);
        assert_eq!(view.logs[1].message, "found");
        let solved = view.outcome.as_ref().and_then(SolveOutcome::solved).unwrap();
        assert_eq!(solved.plaintext, "HELLO");
        assert_eq!(solved.raw_plaintext, "HELLO");
        assert_eq!(solved.score, 0.92);
        assert_eq!(solved.key, vec!["A", "B", "C"]);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.fetch_calls(), 2);
        assert!(!controller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logs_follow_latest_snapshot() {
        let script = [
            vec!["a"],
            vec!["a", "b"],
            vec!["a", "b"],
            vec!["a", "b", "c", "d"],
        ];
        let api = Arc::new(ScriptedApi::new().with_fetches(
            script.iter().map(|messages| running(messages)).collect(),
        ));
        let mut controller = controller(&api);

        controller.start("KHOOR", None).unwrap();
        step(&mut controller).await;

        for messages in &script {
            step(&mut controller).await;
            assert_eq!(controller.view().logs, logs(messages));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_transport_failure() {
        let api = Arc::new(ScriptedApi::new().with_submits(vec![SubmitStep::TransportFailure(
            "connection refused".to_string(),
        )]));
        let mut controller = controller(&api);

        controller.start("KHOOR", None).unwrap();
        step(&mut controller).await;

        let view = controller.view();
        assert_eq!(view.phase, Phase::Error);
        assert!(view.job.is_none());
        let error = view.outcome.as_ref().and_then(SolveOutcome::error).unwrap();
        assert!(error.contains("connection refused"));
        assert!(!controller.is_polling());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.fetch_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_is_rejected_locally() {
        let api = Arc::new(ScriptedApi::new());
        let mut controller = controller(&api);

        let err = controller.start("", Some(1)).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Rejected(ClientError::Validation(_))
        ));
        assert_eq!(controller.view().phase, Phase::Error);
        assert!(controller.view().outcome.as_ref().and_then(SolveOutcome::error).is_some());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(api.submit_calls(), 0);
        assert!(!controller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_while_polling() {
        let api = Arc::new(ScriptedApi::new());
        let mut controller = controller(&api);

        controller.start("KHOOR", None).unwrap();
        step(&mut controller).await;
        step(&mut controller).await;
        assert_eq!(api.fetch_calls(), 1);

        controller.reset();
        assert_eq!(controller.view(), &JobView::default());
        assert!(!controller.is_polling());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_after_done() {
        let api = Arc::new(ScriptedApi::new().with_fetches(vec![hello_done(&["found"])]));
        let mut controller = controller(&api);

        controller.start("KHOOR", None).unwrap();
        controller.run_until_settled().await;
        assert_eq!(controller.view().phase, Phase::Done);

        controller.reset();
        let view = controller.view();
        assert_eq!(view.phase, Phase::Idle);
        assert!(view.logs.is_empty());
        assert!(view.outcome.is_none());
        assert!(view.job.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_when_idle() {
        let api = Arc::new(ScriptedApi::new());
        let mut controller = controller(&api);

        controller.reset();
        assert_eq!(controller.view(), &JobView::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_submit_reply_is_discarded() {
        let api = Arc::new(ScriptedApi::new().with_submit_delay(Duration::from_secs(5)));
        let mut controller = controller(&api);

        controller.start("FIRST", None).unwrap();
        controller.reset();
        controller.start("SECOND", None).unwrap();

        // Both replies land at the same instant, in no guaranteed order
        step(&mut controller).await;
        step(&mut controller).await;

        let call = api
            .submitted()
            .iter()
            .position(|req| req.cipher == "SECOND")
            .unwrap()
            + 1;
        let second = Job::new(format!("t{}", call));
        assert_eq!(controller.view().job, Some(second.clone()));

        step(&mut controller).await;
        assert_eq!(api.fetched_jobs(), vec![second]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_after_reset_is_discarded() {
        let api = Arc::new(ScriptedApi::new().with_submit_delay(Duration::from_secs(5)));
        let mut controller = controller(&api);

        controller.start("KHOOR", None).unwrap();
        controller.reset();

        step(&mut controller).await;
        assert_eq!(controller.view(), &JobView::default());
        assert!(!controller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_is_transient() {
        let api = Arc::new(ScriptedApi::new().with_fetches(vec![
            running(&["a"]),
            FetchStep::TransportFailure("connection reset".to_string()),
            hello_done(&["a", "found"]),
        ]));
        let mut controller = controller(&api);

        controller.start("KHOOR", None).unwrap();
        step(&mut controller).await;
        step(&mut controller).await;
        step(&mut controller).await;

        let view = controller.view();
        assert_eq!(view.phase, Phase::Running);
        assert_eq!(view.logs.len(), 1);
        assert!(view.poll_warning.as_deref().unwrap().contains("connection reset"));

        controller.run_until_settled().await;
        assert_eq!(controller.view().phase, Phase::Done);
        assert!(controller.view().poll_warning.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_404_while_polling_does_not_end_the_job() {
        let api = Arc::new(ScriptedApi::new().with_fetches(vec![
            FetchStep::HttpStatus(404, "Not Found".to_string()),
            hello_done(&["a", "found"]),
        ]));
        let mut controller = controller(&api);

        controller.start("KHOOR", None).unwrap();
        step(&mut controller).await;
        step(&mut controller).await;

        let view = controller.view();
        assert_eq!(view.phase, Phase::Running);
        assert!(view.outcome.is_none());
        assert!(view.poll_warning.as_deref().unwrap().contains("404"));

        controller.run_until_settled().await;
        assert_eq!(controller.view().phase, Phase::Done);
        assert_eq!(api.fetch_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_error_is_shown_verbatim() {
        let api = Arc::new(ScriptedApi::new().with_fetches(vec![FetchStep::Snapshot(
            TaskSnapshot {
                status: JobStatus::Error,
                logs: logs(&["[START] len=0"]),
                result: Some(TaskResult {
                    error: Some("empty after preprocessing".to_string()),
                    ..Default::default()
                }),
            },
        )]));
        let mut controller = controller(&api);

        controller.start("123", None).unwrap();
        controller.run_until_settled().await;

        let view = controller.view();
        assert_eq!(view.phase, Phase::Error);
        assert_eq!(
            view.outcome,
            Some(SolveOutcome::failed("empty after preprocessing"))
        );
        assert_eq!(view.logs.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_task_ends_in_error() {
        let api = Arc::new(ScriptedApi::new().with_fetches(vec![FetchStep::NotFound]));
        let mut controller = controller(&api);

        controller.start("KHOOR", None).unwrap();
        controller.run_until_settled().await;

        let view = controller.view();
        assert_eq!(view.phase, Phase::Error);
        assert!(view.outcome.as_ref().and_then(SolveOutcome::error).unwrap().contains("t1"));
        assert!(!controller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_settled() {
        let api = Arc::new(ScriptedApi::new().with_fetches(vec![hello_done(&["found"])]));
        let mut controller = controller(&api);

        controller.start("KHOOR", None).unwrap();
        controller.run_until_settled().await;
        assert_eq!(controller.view().phase, Phase::Done);

        controller.start("KHOOR", Some(7)).unwrap();
        assert_eq!(controller.view().phase, Phase::Running);
        assert!(controller.view().logs.is_empty());
        assert!(controller.view().outcome.is_none());

        step(&mut controller).await;
        assert_eq!(controller.view().job, Some(Job::new("t2")));
        assert_eq!(api.submit_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_for_other_jobs_are_ignored() {
        let api = Arc::new(ScriptedApi::new());
        let mut controller = controller(&api);

        controller.start("KHOOR", None).unwrap();
        step(&mut controller).await;
        let before = controller.view().clone();

        controller.handle(ControllerEvent::Poll(PollEvent::Update {
            job: Job::new("stranger"),
            snapshot: TaskSnapshot::running(logs(&["x"])),
        }));
        controller.handle(ControllerEvent::Poll(PollEvent::Lost {
            job: Job::new("stranger"),
            error: ClientError::NotFound("stranger".to_string()),
        }));

        assert_eq!(controller.view(), &before);
        assert!(controller.is_polling());
    }

    #[test]
    fn test_can_start_gate() {
        let mut view = JobView::default();
        assert!(view.can_start("KHOOR"));
        assert!(!view.can_start(""));

        view.phase = Phase::Running;
        assert!(!view.can_start("KHOOR"));

        view.phase = Phase::Error;
        assert!(view.can_start("KHOOR"));
    }
}
