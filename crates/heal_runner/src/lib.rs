//! # heal_runner
//!
//! Test execution wrapper for selfheal.
//!
//! This crate launches browser test scripts and captures what the test
//! command printed, without interpreting it.
//!
//! # Features
//!
//! - **Pytest Runner**: Process-based execution with timeout and kill-on-drop
//! - **Script Discovery**: Glob matching with natural ordinal ordering
//! - **Output Streaming**: Optional per-line handler while the run is in progress
//! - **Dry-Run Mode**: Log commands without execution
//! - **Mock Runner**: For testing without launching pytest
//!
//! # Example
//!
//! ```rust,no_run
//! use heal_runner::{discover_scripts, PytestRunner, RunnerConfig, TestRunner};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = PytestRunner::new(RunnerConfig::default().results_dir("allure-results"))?;
//!     let scripts = discover_scripts(Path::new("playwright_scripts"), "test_playwright_*.py")?;
//!
//!     let outcome = runner.run(&scripts).await?;
//!     println!("{}", outcome.status_line());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod pytest;
pub mod runner;

pub use config::RunnerConfig;
pub use error::{RunnerError, RunnerResult};
pub use mock::{MockResponse, MockRunner};
pub use pytest::{LogHandler, LogLine, LogStream, PytestRunner, PytestRunnerOptions};
pub use runner::{discover_scripts, RunOutcome, TestRunner};
