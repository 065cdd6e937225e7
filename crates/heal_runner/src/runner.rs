//! Test runner trait and types.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};

/// Result of one test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Exit code, `None` when the process was killed or timed out
    pub exit_code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Whether the run was stopped by the timeout
    pub timed_out: bool,
}

impl RunOutcome {
    /// Check if every selected test passed (exit code 0).
    pub fn passed(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// One-line description for logs and summaries.
    pub fn status_line(&self) -> String {
        if self.timed_out {
            format!("timed out after {} ms", self.duration_ms)
        } else {
            match self.exit_code {
                Some(0) => format!("passed in {} ms", self.duration_ms),
                Some(code) => format!("failed with exit code {} in {} ms", code, self.duration_ms),
                None => format!("terminated by signal after {} ms", self.duration_ms),
            }
        }
    }
}

/// Test runner trait.
///
/// Runs the given scripts and reports the raw outcome. Implementations do
/// not interpret test output.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Run the given scripts in one test invocation.
    async fn run(&self, scripts: &[PathBuf]) -> RunnerResult<RunOutcome>;

    /// Human-readable description of the command, for logs.
    fn describe(&self) -> String;
}

/// Find scripts in `dir` whose file name matches `pattern`.
///
/// Results are ordered by the trailing number in the file stem, so
/// `case_2.py` comes before `case_10.py`.
pub fn discover_scripts(dir: &Path, pattern: &str) -> RunnerResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RunnerError::ScriptsDirNotFound(dir.to_path_buf()));
    }

    let full = dir.join(pattern);
    let full = full.to_string_lossy();
    let entries = glob::glob(&full).map_err(|e| RunnerError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut scripts: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|p| p.is_file())
        .collect();
    scripts.sort_by(|a, b| natural_key(a).cmp(&natural_key(b)));

    debug!("Discovered {} scripts in {:?}", scripts.len(), dir);
    Ok(scripts)
}

fn natural_key(path: &Path) -> (String, u64, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let digits_at = stem
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let number = stem[digits_at..].parse().unwrap_or(u64::MAX);
    (stem[..digits_at].to_string(), number, stem)
}
