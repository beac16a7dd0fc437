// src/session/execution.rs
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::future::{AbortHandle, Abortable};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::backend::Backend;
use crate::challenge::Challenge;
use crate::errors::Result;
use crate::models::{ResultEvent, ResultStatus, RunPythonRequest};
use crate::stream::{decode_events, with_idle_timeout};

pub const CONNECTION_FAILURE_MESSAGE: &str =
    "Failed to connect to Python server. Please make sure the server is running.";

/// Results of one run, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RunLog {
    events: Vec<ResultEvent>,
}

impl RunLog {
    pub fn events(&self) -> &[ResultEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Appends without deduplicating: a repeated ordinal shows up twice.
    pub fn push(&mut self, event: ResultEvent) {
        self.events.push(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Replaces whatever arrived with a single connection failure entry.
    ///
    /// Partial results are intentionally thrown away so the user sees one clear
    /// failure instead of a half-filled result list.
    pub fn set_connection_failure(&mut self) {
        self.events = vec![ResultEvent {
            test_case: 1,
            status: ResultStatus::Error,
            message: CONNECTION_FAILURE_MESSAGE.to_string(),
        }];
    }

    pub fn passing_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_success()).count()
    }

    /// True iff there is at least one result and every result succeeded.
    pub fn can_submit(&self) -> bool {
        !self.events.is_empty() && self.events.iter().all(ResultEvent::is_success)
    }

    /// Results grouped by the ordinal the executor reported, whatever the arrival order.
    pub fn by_ordinal(&self) -> BTreeMap<u32, Vec<&ResultEvent>> {
        let mut map: BTreeMap<u32, Vec<&ResultEvent>> = BTreeMap::new();
        for event in &self.events {
            map.entry(event.test_case).or_default().push(event);
        }
        map
    }

    /// Whether every ordinal from 1 to `submitted` has a result.
    pub fn is_complete(&self, submitted: usize) -> bool {
        let ordinals = self.by_ordinal();
        (1..=submitted as u32).all(|n| ordinals.contains_key(&n))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSnapshot {
    pub running: bool,
    pub generation: u64,
    pub log: RunLog,
}

/// What one call to [`ExecutionSession::run`] ended with.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub generation: u64,
    /// The run was replaced by a newer one before it settled; `log` is then empty.
    pub superseded: bool,
    pub log: RunLog,
    pub transport_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// The run settled on its own and every result passed.
    pub fn passed(&self) -> bool {
        !self.superseded && self.transport_error.is_none() && self.log.can_submit()
    }
}

#[derive(Default)]
struct ExecutionState {
    generation: u64,
    running: bool,
    log: RunLog,
    abort: Option<AbortHandle>,
}

fn lock_state(state: &Mutex<ExecutionState>) -> MutexGuard<'_, ExecutionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Returns the session to idle when a run ends, including when its future is dropped.
struct RunGuard<'a> {
    state: &'a Mutex<ExecutionState>,
    generation: u64,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock_state(self.state);
        if state.generation == self.generation {
            state.running = false;
            state.abort = None;
        }
    }
}

/// Drives runs against the executor. Starting a run aborts the one before it.
pub struct ExecutionSession<B> {
    backend: Arc<B>,
    idle_timeout: Duration,
    state: Arc<Mutex<ExecutionState>>,
}

impl<B: Backend> ExecutionSession<B> {
    pub fn new(backend: Arc<B>, idle_timeout: Duration) -> Self {
        Self { backend, idle_timeout, state: Arc::new(Mutex::new(ExecutionState::default())) }
    }

    fn lock(&self) -> MutexGuard<'_, ExecutionState> {
        lock_state(&self.state)
    }

    pub fn snapshot(&self) -> ExecutionSnapshot {
        let state = self.lock();
        ExecutionSnapshot {
            running: state.running,
            generation: state.generation,
            log: state.log.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn log(&self) -> RunLog {
        self.lock().log.clone()
    }

    pub fn can_submit(&self) -> bool {
        self.lock().log.can_submit()
    }

    pub fn submit(&self) -> SubmitOutcome {
        if self.can_submit() {
            SubmitOutcome::Accepted
        } else {
            SubmitOutcome::Rejected
        }
    }

    /// Runs `code` against the challenge's test cases and waits for the stream to end.
    ///
    /// Does nothing and returns `None` when no challenge is loaded.
    pub async fn run(&self, challenge: Option<&Challenge>, code: &str) -> Option<RunReport> {
        let challenge = challenge?;
        let request = RunPythonRequest {
            code: code.to_string(),
            test_cases: challenge.test_cases.clone(),
        };

        let (generation, registration) = {
            let mut state = self.lock();
            if let Some(previous) = state.abort.take() {
                log::info!("⏹️  Aborting run #{}", state.generation);
                previous.abort();
            }
            state.generation += 1;
            state.running = true;
            state.log.clear();
            let (handle, registration) = AbortHandle::new_pair();
            state.abort = Some(handle);
            (state.generation, registration)
        };
        let _idle_on_exit = RunGuard { state: &self.state, generation };

        log::info!("▶️  Run #{} for challenge '{}'", generation, challenge.id);
        let started_at = Utc::now();
        let result = Abortable::new(self.consume(generation, &request), registration).await;

        let mut state = self.lock();
        let current = state.generation == generation;
        let mut transport_error = None;

        match result {
            Err(_aborted) => {}
            Ok(Ok(())) => {}
            Ok(Err(e)) if current => {
                log::error!("❌ Run #{} failed: {}", generation, e);
                state.log.set_connection_failure();
                transport_error = Some(e.to_string());
            }
            Ok(Err(e)) => {
                log::debug!("Ignoring failure of stale run #{}: {}", generation, e);
            }
        }

        let log = if current {
            log::info!(
                "🏁 Run #{} finished: {}/{} passing",
                generation,
                state.log.passing_count(),
                state.log.len()
            );
            state.log.clone()
        } else {
            RunLog::default()
        };
        drop(state);

        Some(RunReport {
            generation,
            superseded: !current,
            log,
            transport_error,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn consume(&self, generation: u64, request: &RunPythonRequest) -> Result<()> {
        let body = self.backend.run_python(request).await?;
        let events = decode_events(with_idle_timeout(body, self.idle_timeout));
        futures::pin_mut!(events);

        while let Some(event) = events.next().await {
            self.append(generation, event?);
        }
        Ok(())
    }

    /// Returns false when `generation` is no longer the current run.
    fn append(&self, generation: u64, event: ResultEvent) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            log::debug!(
                "Dropping result {} of stale run #{} (current #{})",
                event.test_case,
                generation,
                state.generation
            );
            return false;
        }
        state.log.push(event);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FORBIDDEN_NOTICE;
    use crate::session::testing::{RunScript, ScriptedBackend, data_line, refused};
    use serde_json::json;

    fn challenge() -> Challenge {
        Challenge {
            id: "sum-list".to_string(),
            title: None,
            instructions: "Sum the numbers.".to_string(),
            examples: "main([1, 2]) -> 3".to_string(),
            test_cases: vec![
                json!({"input": [[1, 2, 3]], "expected": 6}),
                json!({"input": [[]], "expected": 0}),
            ],
            media: None,
        }
    }

    fn session(
        runs: Vec<RunScript>,
    ) -> (Arc<ScriptedBackend>, ExecutionSession<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::with_runs(runs));
        let session = ExecutionSession::new(Arc::clone(&backend), Duration::from_secs(5));
        (backend, session)
    }

    fn event(test_case: u32, status: ResultStatus) -> ResultEvent {
        ResultEvent { test_case, status, message: String::new() }
    }

    #[tokio::test]
    async fn test_no_challenge_is_a_noop() {
        let (backend, session) = session(vec![]);
        assert!(session.run(None, "pass").await.is_none());
        assert!(backend.run_requests.lock().unwrap().is_empty());
        assert_eq!(session.snapshot().generation, 0);
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_successful_run_enables_submit() {
        let line = b"data: {\"testCase\":1,\"status\":\"success\",\"message\":\"OK\"}\n".to_vec();
        let (backend, session) = session(vec![RunScript::Chunks(vec![Ok(line)])]);
        let code = "def main(numbers): return sum(numbers)";

        let report = session.run(Some(&challenge()), code).await.unwrap();

        assert!(!report.superseded);
        assert_eq!(
            report.log.events(),
            &[ResultEvent {
                test_case: 1,
                status: ResultStatus::Success,
                message: "OK".to_string(),
            }]
        );
        assert!(session.can_submit());
        assert!(report.passed());
        assert_eq!(session.submit(), SubmitOutcome::Accepted);

        let requests = backend.run_requests.lock().unwrap();
        assert_eq!(requests[0].code, code);
        assert_eq!(requests[0].test_cases, challenge().test_cases);
    }

    #[tokio::test]
    async fn test_forbidden_blocks_submit() {
        let line = data_line(1, "forbidden", "leaked key");
        let (_backend, session) = session(vec![RunScript::Chunks(vec![Ok(line)])]);

        let report = session.run(Some(&challenge()), "import os").await.unwrap();

        let shown = report.log.events()[0].display_message();
        assert_eq!(shown, FORBIDDEN_NOTICE);
        assert_ne!(shown, "leaked key");
        assert_eq!(session.submit(), SubmitOutcome::Rejected);
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_refused_connection_yields_single_error() {
        let (_backend, session) = session(vec![RunScript::Refused]);

        let report = session.run(Some(&challenge()), "pass").await.unwrap();

        assert_eq!(report.log.len(), 1);
        let only = &report.log.events()[0];
        assert_eq!(only.test_case, 1);
        assert_eq!(only.status, ResultStatus::Error);
        assert_eq!(only.message, CONNECTION_FAILURE_MESSAGE);
        assert!(report.transport_error.is_some());
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_broken_stream_discards_partial_results() {
        let chunks = vec![
            Ok(data_line(1, "success", "ok")),
            Ok(data_line(2, "success", "ok")),
            Err(refused()),
        ];
        let (_backend, session) = session(vec![RunScript::Chunks(chunks)]);

        let report = session.run(Some(&challenge()), "pass").await.unwrap();

        assert_eq!(report.log.len(), 1);
        assert_eq!(report.log.events()[0].message, CONNECTION_FAILURE_MESSAGE);
        assert!(!session.can_submit());
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_idle_stream_times_out() {
        let backend = Arc::new(ScriptedBackend::with_runs(vec![RunScript::ChunksThenHang(
            vec![data_line(1, "success", "ok")],
        )]));
        let session = ExecutionSession::new(backend, Duration::from_millis(50));

        let report = session.run(Some(&challenge()), "pass").await.unwrap();

        assert_eq!(report.log.events()[0].message, CONNECTION_FAILURE_MESSAGE);
        assert!(report.transport_error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_duplicate_ordinals_are_kept() {
        let body = [data_line(1, "success", "a"), data_line(1, "success", "b")].concat();
        let chunks = vec![Ok(body)];
        let (_backend, session) = session(vec![RunScript::Chunks(chunks)]);

        let report = session.run(Some(&challenge()), "pass").await.unwrap();

        assert_eq!(report.log.len(), 2);
        assert_eq!(report.log.by_ordinal()[&1].len(), 2);
        assert!(!report.log.is_complete(2));
    }

    #[tokio::test]
    async fn test_new_run_clears_previous_log() {
        let (_backend, session) = session(vec![
            RunScript::Chunks(vec![Ok(data_line(1, "error", "boom"))]),
            RunScript::Chunks(vec![Ok(data_line(1, "success", "ok"))]),
        ]);

        session.run(Some(&challenge()), "v1").await.unwrap();
        assert!(!session.can_submit());

        let report = session.run(Some(&challenge()), "v2").await.unwrap();
        assert_eq!(report.generation, 2);
        assert_eq!(report.log.len(), 1);
        assert!(session.can_submit());
    }

    #[tokio::test]
    async fn test_restart_aborts_stale_run() {
        let (_backend, session) = session(vec![
            RunScript::ChunksThenHang(vec![data_line(1, "error", "old")]),
            RunScript::Chunks(vec![
                Ok(data_line(1, "success", "new")),
                Ok(data_line(2, "success", "new")),
            ]),
        ]);
        let current = challenge();

        let (first, second) = futures::join!(
            session.run(Some(&current), "slow"),
            session.run(Some(&current), "fast"),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert!(first.superseded);
        assert!(first.log.is_empty());
        assert!(!first.passed());
        assert!(!second.superseded);
        assert_eq!(second.generation, 2);

        let log = session.log();
        assert_eq!(log.len(), 2);
        assert!(log.events().iter().all(|e| e.message == "new"));
        assert!(log.is_complete(2));
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_cancelled_run_returns_to_idle() {
        let (_backend, session) = session(vec![RunScript::ChunksThenHang(vec![data_line(
            1, "success", "ok",
        )])]);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), session.run(Some(&challenge()), "pass"))
                .await;

        assert!(cancelled.is_err());
        let snapshot = session.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.log.len(), 1);
        assert!(session.lock().abort.is_none());
    }

    #[test]
    fn test_dropped_stale_run_keeps_current_running() {
        let (_backend, session) = session(vec![]);
        {
            let mut state = session.lock();
            state.generation = 2;
            state.running = true;
        }

        drop(RunGuard { state: &session.state, generation: 1 });
        assert!(session.is_running());

        drop(RunGuard { state: &session.state, generation: 2 });
        assert!(!session.is_running());
    }

    #[test]
    fn test_stale_append_is_dropped() {
        let (_backend, session) = session(vec![]);
        session.lock().generation = 3;

        assert!(!session.append(2, event(1, ResultStatus::Success)));
        assert!(session.append(3, event(1, ResultStatus::Success)));
        assert_eq!(session.log().len(), 1);
    }

    #[test]
    fn test_submit_gate() {
        let mut log = RunLog::default();
        assert!(!log.can_submit());

        log.push(event(1, ResultStatus::Success));
        log.push(event(2, ResultStatus::Success));
        assert!(log.can_submit());
        assert_eq!(log.passing_count(), 2);

        log.events[1].status = ResultStatus::Failure;
        assert!(!log.can_submit());
        assert_eq!(log.passing_count(), 1);

        log.events[1].status = ResultStatus::Success;
        assert!(log.can_submit());
    }

    #[test]
    fn test_ordinal_view_ignores_arrival_order() {
        let mut log = RunLog::default();
        log.push(event(3, ResultStatus::Success));
        log.push(event(1, ResultStatus::Failure));
        assert!(!log.is_complete(3));

        log.push(event(2, ResultStatus::Success));
        assert!(log.is_complete(3));
        let ordinals: Vec<u32> = log.by_ordinal().keys().copied().collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }
}
