//! Run configuration.
//!
//! Loaded from a TOML file (`heal.toml` by default). Every field has a
//! default, so an empty file or no file at all is a valid configuration.
//!
//! ```toml
//! [paths]
//! cases = "testcases.json"
//! scripts = "playwright_scripts"
//!
//! [llm]
//! provider = "deepseek"
//!
//! [repair]
//! max_attempts = 3
//! correlation_policy = "abort"
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use heal_llm::{ClientConfig, LlmProvider, DEFAULT_TIMEOUT_SECS};
use heal_runner::RunnerConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::sanitize::DEFAULT_REQUIRED_IMPORTS;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "heal.toml";

/// Workspace file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Case store (JSON, or YAML by extension)
    pub cases: PathBuf,
    /// Directory holding one live script per case
    pub scripts: PathBuf,
    /// Report artifact: output of the most recent test run
    pub report: PathBuf,
    /// Structured results directory passed to the runner
    pub results: PathBuf,
    /// UI snapshots used for generation
    pub snapshots: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cases: PathBuf::from("testcases.json"),
            scripts: PathBuf::from("playwright_scripts"),
            report: PathBuf::from("pytest_errors.log"),
            results: PathBuf::from("allure-results"),
            snapshots: PathBuf::from("snapshots"),
        }
    }
}

impl PathsConfig {
    fn resolve_against(&mut self, base: &Path) {
        for path in [
            &mut self.cases,
            &mut self.scripts,
            &mut self.report,
            &mut self.results,
            &mut self.snapshots,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Completion service settings. The API key is read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Overrides the provider's default endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Overrides the provider's default model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::DeepSeek,
            endpoint: None,
            model: None,
            api_key_env: LlmProvider::DeepSeek.key_env().to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Test command settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub command: Vec<String>,
    pub args: Vec<String>,
    /// Hard timeout per run (0 = none)
    pub timeout_secs: u64,
    /// Scripts picked up by `run-tests`
    pub script_glob: String,
}

impl Default for RunnerSection {
    fn default() -> Self {
        let defaults = RunnerConfig::default();
        Self {
            command: defaults.command,
            args: defaults.args,
            timeout_secs: defaults.timeout_seconds,
            script_glob: "test_playwright_*.py".to_string(),
        }
    }
}

/// What to do with a failing script that maps to no test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationPolicy {
    /// Abandon the script for the rest of the run
    #[default]
    Skip,
    /// Stop the run with an error
    Abort,
}

impl fmt::Display for CorrelationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Repair loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub max_attempts: u32,
    /// Repairs in flight at once
    pub concurrency: usize,
    /// Failure detail sent to the completion service is cut to this many characters
    pub max_detail_chars: usize,
    pub correlation_policy: CorrelationPolicy,
    /// Script file names are `<prefix>_<N>.py`
    pub script_prefix: String,
    pub required_imports: Vec<String>,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            concurrency: 1,
            max_detail_chars: 4000,
            correlation_policy: CorrelationPolicy::Skip,
            script_prefix: "test_playwright".to_string(),
            required_imports: DEFAULT_REQUIRED_IMPORTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Complete configuration for one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealConfig {
    pub paths: PathsConfig,
    pub llm: LlmConfig,
    pub runner: RunnerSection,
    pub repair: RepairConfig,
}

impl HealConfig {
    /// Parse TOML text. Relative paths are left as written.
    pub fn from_toml(content: &str) -> CoreResult<Self> {
        toml::from_str(content).map_err(|e| CoreError::InvalidConfig(e.to_string()))
    }

    /// Load from a file; relative paths resolve against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CoreError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CoreError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        config.paths.resolve_against(base);

        config.validate()?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from a file if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No configuration at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    /// Reject settings the repair loop cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.repair.concurrency == 0 {
            return Err(CoreError::InvalidConfig(
                "repair.concurrency must be at least 1".to_string(),
            ));
        }
        if self.runner.command.iter().all(|c| c.trim().is_empty()) {
            return Err(CoreError::InvalidConfig(
                "runner.command must not be empty".to_string(),
            ));
        }
        if self.repair.script_prefix.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "repair.script_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Runner settings for the pytest runner.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig::new()
            .command(self.runner.command.clone())
            .args(self.runner.args.clone())
            .results_dir(self.paths.results.clone())
            .timeout(self.runner.timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    /// Client settings with the API key taken from `llm.api_key_env`.
    pub fn client_config(&self) -> CoreResult<ClientConfig> {
        let key = std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                CoreError::InvalidConfig(format!(
                    "API key not set: export {}",
                    self.llm.api_key_env
                ))
            })?;

        let mut config = ClientConfig::new(self.llm.provider, key).timeout(self.llm_timeout());
        if let Some(endpoint) = &self.llm.endpoint {
            config = config.endpoint(endpoint.clone());
        }
        if let Some(model) = &self.llm.model {
            config = config.model(model.clone());
        }
        Ok(config)
    }
}
