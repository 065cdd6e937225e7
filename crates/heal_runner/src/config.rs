//! Test runner configuration types.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the test command is launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Program and leading arguments, e.g. `["pytest"]` or `["python", "-m", "pytest"]`
    pub command: Vec<String>,
    /// Arguments placed before the script list
    pub args: Vec<String>,
    /// Directory for structured results (`--alluredir`), if any
    pub results_dir: Option<PathBuf>,
    /// Working directory for the test process
    pub workdir: Option<PathBuf>,
    /// Extra environment variables
    pub env: HashMap<String, String>,
    /// Timeout in seconds (0 = no timeout)
    pub timeout_seconds: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: vec!["pytest".to_string()],
            args: vec!["--verbose".to_string(), "-rfE".to_string()],
            results_dir: None,
            workdir: None,
            env: HashMap::new(),
            timeout_seconds: 600,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Program name, if a command is configured.
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.program(), Some("pytest"));
        assert_eq!(config.args, vec!["--verbose", "-rfE"]);
        assert_eq!(config.timeout_seconds, 600);
        assert!(config.results_dir.is_none());
    }

    #[test]
    fn test_builder() {
        let config = RunnerConfig::new()
            .command(vec!["python".into(), "-m".into(), "pytest".into()])
            .results_dir("allure-results")
            .env("HEADLESS", "1")
            .timeout(0);

        assert_eq!(config.program(), Some("python"));
        assert_eq!(config.env.get("HEADLESS"), Some(&"1".to_string()));
        assert_eq!(config.timeout_seconds, 0);
    }
}
