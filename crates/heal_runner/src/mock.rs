//! Mock test runner for testing.
//!
//! Provides a configurable mock implementation of the TestRunner trait
//! for use in unit tests without launching pytest.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{RunnerError, RunnerResult};
use crate::runner::{RunOutcome, TestRunner};

/// Predefined mock response for a test run.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl MockResponse {
    /// A run where every test passed.
    pub fn passing(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
            timed_out: false,
        }
    }

    /// A run with failing tests (pytest exit code 1).
    pub fn failing(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(1),
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
            timed_out: false,
        }
    }

    /// A run stopped by the timeout.
    pub fn timed_out() -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: "Test run timed out".to_string(),
            duration_ms: 100,
            timed_out: true,
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    fn into_outcome(self) -> RunOutcome {
        let finished_at = Utc::now();
        let started_at = finished_at - chrono::Duration::milliseconds(self.duration_ms as i64);
        RunOutcome {
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
            started_at,
            finished_at,
            duration_ms: self.duration_ms,
            timed_out: self.timed_out,
        }
    }
}

/// Mock test runner for testing.
///
/// Captures the scripts of every call and returns predefined responses in
/// order. Once the list is exhausted the last response repeats; with no
/// responses every run passes.
#[derive(Clone)]
pub struct MockRunner {
    responses: Arc<RwLock<Vec<MockResponse>>>,
    response_index: Arc<AtomicUsize>,
    captured_calls: Arc<RwLock<Vec<Vec<PathBuf>>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Add a mock response for the next run.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set multiple responses.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Make every run fail to launch.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<Vec<PathBuf>> {
        self.captured_calls.read().clone()
    }

    /// Get the number of runs made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    fn next_response(&self) -> MockResponse {
        let responses = self.responses.read();
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        match responses.len() {
            0 => MockResponse::passing(""),
            n => responses[index.min(n - 1)].clone(),
        }
    }
}

#[async_trait]
impl TestRunner for MockRunner {
    async fn run(&self, scripts: &[PathBuf]) -> RunnerResult<RunOutcome> {
        self.captured_calls.write().push(scripts.to_vec());

        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }

        Ok(self.next_response().into_outcome())
    }

    fn describe(&self) -> String {
        "mock runner".to_string()
    }
}
