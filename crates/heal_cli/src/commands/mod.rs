//! CLI command definitions.
//!
//! This module defines the command structure for the selfheal CLI.
//! Each subcommand maps to one stage of the generate / run / repair cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use heal_core::HealConfig;
use heal_llm::ChatCompletionClient;
use heal_runner::{LogLine, PytestRunner};
use tracing::info;

pub mod check_selectors;
pub mod extract_requirements;
pub mod failures;
pub mod generate_cases;
pub mod generate_scripts;
pub mod init;
pub mod repair;
pub mod sanitize;

/// selfheal - self-healing UI test generation and repair
#[derive(Parser)]
#[command(name = "heal")]
#[command(version, about = "selfheal - self-healing UI test generation and repair")]
#[command(long_about = r#"
selfheal generates Playwright UI tests with an LLM, runs them with pytest,
and repairs failing scripts until they pass or the attempt budget runs out.

WORKFLOW:
  init                  → Write a default heal.toml
  extract-requirements  → List testable requirements from a document
  generate-cases        → Design test cases from UI snapshots
  generate-scripts      → Write one Playwright script per test case
  check-selectors       → Look script selectors up in the page snapshot
  run-tests             → Run every script and write the report
  failures              → Show the failures in the report
  repair                → Repair failing scripts until they pass
  sanitize              → Clean up and check a single script

The API key is read from the variable named by llm.api_key_env
(DEEPSEEK_API_KEY by default).

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Tests still failing
  4 - Resource error
  5 - Cancelled
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = heal_core::DEFAULT_CONFIG_FILE, env = "HEAL_CONFIG")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init(init::InitArgs),

    /// Run every script and write the report
    #[command(name = "run-tests")]
    RunTests(run_tests::RunTestsArgs),

    /// Show failures extracted from the report
    Failures(failures::FailuresArgs),

    /// Sanitize and validate a script file
    Sanitize(sanitize::SanitizeArgs),

    /// Generate test cases from UI snapshots
    #[command(name = "generate-cases")]
    GenerateCases(generate_cases::GenerateCasesArgs),

    /// Generate one script per test case
    #[command(name = "generate-scripts")]
    GenerateScripts(generate_scripts::GenerateScriptsArgs),

    /// Repair failing scripts until they pass
    Repair(repair::RepairArgs),

    /// Extract testable requirements from a requirement document
    #[command(name = "extract-requirements")]
    ExtractRequirements(extract_requirements::ExtractRequirementsArgs),

    /// Check script selectors against the page snapshot
    #[command(name = "check-selectors")]
    CheckSelectors(check_selectors::CheckSelectorsArgs),
}

/// Output format for commands that print results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Load the configuration file, falling back to defaults when it is absent.
pub fn load_config(path: &Path) -> Result<HealConfig> {
    let config = HealConfig::load_or_default(path)
        .with_context(|| format!("Failed to load configuration {:?}", path))?;
    config.validate()?;
    Ok(config)
}

/// Completion client built from the configuration.
pub fn completion_client(config: &HealConfig) -> Result<Arc<ChatCompletionClient>> {
    let client = ChatCompletionClient::new(config.client_config()?)
        .context("Failed to create completion client")?;
    info!(
        "Using {} at {}",
        client.provider(),
        client.endpoint()
    );
    Ok(Arc::new(client))
}

/// Test runner built from the configuration. With `stream`, every output
/// line is echoed to stderr while the run is in progress.
pub fn test_runner(config: &HealConfig, stream: bool) -> Result<PytestRunner> {
    let runner = PytestRunner::new(config.runner_config()).context("Invalid runner configuration")?;
    if !stream {
        return Ok(runner);
    }
    Ok(runner.with_log_handler(Arc::new(|line: LogLine| {
        eprintln!("   [{}] {}", line.stream, line.message);
    })))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}
