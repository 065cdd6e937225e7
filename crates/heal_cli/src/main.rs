//! selfheal CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success (tests pass, repair converged)
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: Tests still failing (repair exhausted, invalid script)
//! - 4: Resource error (case store, scripts or report unreadable/unwritable)
//! - 5: Cancelled

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const TESTS_FAILED: u8 = 3;
    pub const RESOURCE_ERROR: u8 = 4;
    pub const CANCELLED: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "heal=debug"
    } else if cli.quiet {
        "heal=warn"
    } else {
        "heal=info"
    };
    let mut filter = EnvFilter::from_default_env();
    for directive in [level, "warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let config_path = cli.config.clone();
    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, &config_path).await,
        Commands::RunTests(args) => commands::run_tests::execute(args, &config_path).await,
        Commands::Failures(args) => commands::failures::execute(args, &config_path).await,
        Commands::Sanitize(args) => commands::sanitize::execute(args, &config_path).await,
        Commands::GenerateCases(args) => commands::generate_cases::execute(args, &config_path).await,
        Commands::GenerateScripts(args) => {
            commands::generate_scripts::execute(args, &config_path).await
        }
        Commands::Repair(args) => commands::repair::execute(args, &config_path).await,
        Commands::ExtractRequirements(args) => {
            commands::extract_requirements::execute(args, &config_path).await
        }
        Commands::CheckSelectors(args) => {
            commands::check_selectors::execute(args, &config_path).await
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(core) = cause.downcast_ref::<heal_core::CoreError>() {
            return match core {
                heal_core::CoreError::InvalidConfig(_) | heal_core::CoreError::ConfigLoad { .. } => {
                    ExitCodes::INVALID_ARGS
                }
                other if other.is_resource() => ExitCodes::RESOURCE_ERROR,
                _ => ExitCodes::GENERAL_ERROR,
            };
        }
        if cause.downcast_ref::<heal_cases::CaseError>().is_some()
            || cause.downcast_ref::<std::io::Error>().is_some()
        {
            return ExitCodes::RESOURCE_ERROR;
        }
        if let Some(llm) = cause.downcast_ref::<heal_llm::LlmError>() {
            if matches!(llm, heal_llm::LlmError::NotConfigured(_)) {
                return ExitCodes::INVALID_ARGS;
            }
        }
    }
    ExitCodes::GENERAL_ERROR
}
