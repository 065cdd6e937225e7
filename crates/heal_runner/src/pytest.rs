//! Process-based runner for pytest.
//!
//! Launches the configured test command with the selected scripts and
//! captures its output. A failing test run is a normal outcome; only a
//! command that cannot be launched is an error.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{RunOutcome, TestRunner};

/// How long to wait for output pipes to close after the process exited.
/// Browsers started by the tests can inherit the pipes and outlive pytest.
const PIPE_DRAIN_SECS: u64 = 5;

/// Output stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// A line of test output.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: chrono::DateTime<Utc>,
    pub stream: LogStream,
    pub message: String,
}

/// Log handler callback type.
pub type LogHandler = Arc<dyn Fn(LogLine) + Send + Sync>;

/// Pytest runner options.
#[derive(Debug, Clone, Default)]
pub struct PytestRunnerOptions {
    /// Dry-run mode (log the command without executing)
    pub dry_run: bool,
}

impl PytestRunnerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Runs scripts through pytest (or any command with the same calling convention).
pub struct PytestRunner {
    config: RunnerConfig,
    options: PytestRunnerOptions,
    log_handler: Option<LogHandler>,
    pipe_drain: Duration,
}

impl PytestRunner {
    /// Create a runner. Fails when no command is configured.
    pub fn new(config: RunnerConfig) -> RunnerResult<Self> {
        if config.program().map_or(true, |p| p.trim().is_empty()) {
            return Err(RunnerError::NoCommand);
        }
        Ok(Self {
            config,
            options: PytestRunnerOptions::default(),
            log_handler: None,
            pipe_drain: Duration::from_secs(PIPE_DRAIN_SECS),
        })
    }

    pub fn with_options(mut self, options: PytestRunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// Forward each output line to `handler` as it arrives.
    pub fn with_log_handler(mut self, handler: LogHandler) -> Self {
        self.log_handler = Some(handler);
        self
    }

    pub fn with_pipe_drain(mut self, limit: Duration) -> Self {
        self.pipe_drain = limit;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Arguments passed after the program name.
    fn build_args(&self, scripts: &[PathBuf]) -> Vec<String> {
        let mut args: Vec<String> = self.config.command.iter().skip(1).cloned().collect();
        args.extend(self.config.args.iter().cloned());
        args.extend(scripts.iter().map(|s| s.to_string_lossy().into_owned()));

        if let Some(results) = &self.config.results_dir {
            args.push(format!("--alluredir={}", results.to_string_lossy()));
        }

        args
    }

    /// Format command for logging.
    fn format_command(&self, args: &[String]) -> String {
        let mut cmd = self.config.program().unwrap_or_default().to_string();
        for arg in args {
            if arg.contains(' ') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }

    async fn execute(&self, scripts: &[PathBuf]) -> RunnerResult<RunOutcome> {
        let program = self.config.program().ok_or(RunnerError::NoCommand)?;
        let args = self.build_args(scripts);

        let mut cmd = Command::new(program);
        cmd.args(&args)
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.workdir {
            cmd.current_dir(dir);
        }

        debug!("Executing: {}", self.format_command(&args));

        let started_at = Utc::now();
        let mut child = cmd.spawn().map_err(|e| RunnerError::SpawnFailed {
            command: program.to_string(),
            message: e.to_string(),
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stderr not captured".to_string()))?;

        let stdout_buf = Arc::new(Mutex::new(String::new()));
        let stderr_buf = Arc::new(Mutex::new(String::new()));
        let stdout_task = tokio::spawn(collect_output(
            stdout,
            LogStream::Stdout,
            stdout_buf.clone(),
            self.log_handler.clone(),
        ));
        let stderr_task = tokio::spawn(collect_output(
            stderr,
            LogStream::Stderr,
            stderr_buf.clone(),
            self.log_handler.clone(),
        ));

        let mut timed_out = false;
        let status = if self.config.timeout_seconds > 0 {
            let limit = Duration::from_secs(self.config.timeout_seconds);
            match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => Some(status?),
                Err(_) => {
                    warn!(
                        "Test run exceeded {} seconds, killing it",
                        self.config.timeout_seconds
                    );
                    timed_out = true;
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill test process: {}", e);
                    }
                    None
                }
            }
        } else {
            Some(child.wait().await?)
        };

        let stdout = drain_output(stdout_task, &stdout_buf, LogStream::Stdout, self.pipe_drain).await;
        let mut stderr = drain_output(stderr_task, &stderr_buf, LogStream::Stderr, self.pipe_drain).await;

        if timed_out {
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&format!(
                "Test run timed out after {} seconds\n",
                self.config.timeout_seconds
            ));
        }

        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        Ok(RunOutcome {
            exit_code: status.and_then(|s| s.code()),
            stdout,
            stderr,
            started_at,
            finished_at,
            duration_ms,
            timed_out,
        })
    }
}

/// Read a pipe to the end into `output`, decoding lossily and handing each
/// line to `handler` when one is set.
async fn collect_output<R>(
    reader: R,
    stream: LogStream,
    output: Arc<Mutex<String>>,
    handler: Option<LogHandler>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                output.lock().push_str(&line);
                if let Some(handler) = &handler {
                    handler(LogLine {
                        timestamp: Utc::now(),
                        stream,
                        message: line.trim_end_matches(['\r', '\n']).to_string(),
                    });
                }
            }
            Err(e) => {
                warn!("Failed to read test {}: {}", stream, e);
                break;
            }
        }
    }
}

/// Wait for a collector to reach end of file, then take what it read.
/// A pipe still held open past `limit` keeps the output read so far.
async fn drain_output(
    mut task: JoinHandle<()>,
    output: &Mutex<String>,
    stream: LogStream,
    limit: Duration,
) -> String {
    if tokio::time::timeout(limit, &mut task).await.is_err() {
        warn!("Test {} still open after the run ended; keeping output read so far", stream);
        task.abort();
    }
    std::mem::take(&mut *output.lock())
}

#[async_trait]
impl TestRunner for PytestRunner {
    async fn run(&self, scripts: &[PathBuf]) -> RunnerResult<RunOutcome> {
        let args = self.build_args(scripts);
        let cmd_str = self.format_command(&args);

        info!("Running {} scripts", scripts.len());
        debug!("Command: {}", cmd_str);

        if self.options.dry_run {
            info!("[DRY-RUN] Would execute: {}", cmd_str);
            let now = Utc::now();
            return Ok(RunOutcome {
                exit_code: Some(0),
                stdout: format!("[DRY-RUN] Command: {}", cmd_str),
                stderr: String::new(),
                started_at: now,
                finished_at: now,
                duration_ms: 0,
                timed_out: false,
            });
        }

        let outcome = self.execute(scripts).await?;
        if outcome.passed() {
            info!("Test run {}", outcome.status_line());
        } else {
            warn!("Test run {}", outcome.status_line());
        }
        Ok(outcome)
    }

    fn describe(&self) -> String {
        self.format_command(&self.build_args(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> RunnerConfig {
        RunnerConfig::new()
            .command(vec!["sh".into(), "-c".into(), script.into(), "sh".into()])
            .args(Vec::new())
    }

    #[test]
    fn test_build_args() {
        let config = RunnerConfig::default().results_dir("allure-results");
        let runner = PytestRunner::new(config).unwrap();

        let args = runner.build_args(&[PathBuf::from("scripts/test_playwright_1.py")]);
        assert_eq!(
            args,
            vec![
                "--verbose",
                "-rfE",
                "scripts/test_playwright_1.py",
                "--alluredir=allure-results",
            ]
        );
    }

    #[test]
    fn test_module_invocation_args() {
        let config = RunnerConfig::default()
            .command(vec!["python".into(), "-m".into(), "pytest".into()]);
        let runner = PytestRunner::new(config).unwrap();

        let args = runner.build_args(&[]);
        assert_eq!(args, vec!["-m", "pytest", "--verbose", "-rfE"]);
        assert_eq!(runner.describe(), "python -m pytest --verbose -rfE");
    }

    #[test]
    fn test_empty_command_rejected() {
        let result = PytestRunner::new(RunnerConfig::default().command(Vec::new()));
        assert!(matches!(result, Err(RunnerError::NoCommand)));
    }

    #[tokio::test]
    async fn test_dry_run_mode() {
        let runner = PytestRunner::new(RunnerConfig::default())
            .unwrap()
            .with_options(PytestRunnerOptions::new().dry_run());
        assert!(runner.is_dry_run());

        let outcome = runner.run(&[PathBuf::from("a.py")]).await.unwrap();
        assert!(outcome.passed());
        assert!(outcome.stdout.contains("pytest --verbose -rfE a.py"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_error() {
        let config = RunnerConfig::default().command(vec!["heal-no-such-program-4821".into()]);
        let runner = PytestRunner::new(config).unwrap();

        let result = runner.run(&[]).await;
        assert!(matches!(result, Err(RunnerError::SpawnFailed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_run_captures_output() {
        let runner = PytestRunner::new(sh("echo 'FAILED a.py::t - boom'; echo oops >&2; exit 1")).unwrap();

        let outcome = runner.run(&[]).await.unwrap();
        assert!(!outcome.passed());
        assert_eq!(outcome.exit_code, Some(1));
        assert!(outcome.stdout.contains("FAILED a.py::t - boom"));
        assert!(outcome.stderr.contains("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_log_handler_receives_lines() {
        let lines: Arc<Mutex<Vec<(LogStream, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let runner = PytestRunner::new(sh("echo one; echo two; echo err >&2"))
            .unwrap()
            .with_log_handler(Arc::new(move |line: LogLine| {
                sink.lock().push((line.stream, line.message));
            }));

        let outcome = runner.run(&[]).await.unwrap();
        assert_eq!(outcome.stdout, "one\ntwo\n");

        let lines = lines.lock();
        assert!(lines.contains(&(LogStream::Stdout, "one".to_string())));
        assert!(lines.contains(&(LogStream::Stdout, "two".to_string())));
        assert!(lines.contains(&(LogStream::Stderr, "err".to_string())));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_held_pipe_keeps_output() {
        // The background sleep inherits stdout and keeps it open after sh exits
        let runner = PytestRunner::new(sh("echo 'FAILED a.py::t - boom'; sleep 3 2>/dev/null & exit 1"))
            .unwrap()
            .with_pipe_drain(Duration::from_millis(300));

        let outcome = runner.run(&[]).await.unwrap();
        assert_eq!(outcome.exit_code, Some(1));
        assert!(outcome.stdout.contains("FAILED a.py::t - boom"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_run() {
        let runner = PytestRunner::new(sh("echo started; sleep 30").timeout(1)).unwrap();

        let outcome = runner.run(&[]).await.unwrap();
        assert!(outcome.timed_out);
        assert!(!outcome.passed());
        assert!(outcome.stderr.contains("timed out after 1 seconds"));
    }
}
