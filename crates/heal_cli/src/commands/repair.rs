//! Repair command - Repair failing scripts until they pass.
//!
//! Reads the report written by `run-tests`, repairs each failing script
//! through the completion service and re-runs what it repaired. Ctrl-C
//! stops new repairs from starting; repairs already in flight finish and
//! are verified before the command exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use heal_core::{CorrelationPolicy, RepairOrchestrator, Verdict};

use super::{completion_client, load_config, print_json, test_runner, OutputFormat};
use crate::ExitCodes;

#[derive(Args)]
pub struct RepairArgs {
    /// Maximum repair attempts (overrides repair.max_attempts)
    #[arg(short, long)]
    pub max_attempts: Option<u32>,

    /// Repairs in flight at once (overrides repair.concurrency)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// What to do with scripts that map to no test case
    #[arg(long, value_enum)]
    pub correlation_policy: Option<Policy>,

    /// Report file to read and update (overrides paths.report)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Echo test output during verification runs
    #[arg(long)]
    pub stream: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Policy {
    Skip,
    Abort,
}

impl From<Policy> for CorrelationPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Skip => CorrelationPolicy::Skip,
            Policy::Abort => CorrelationPolicy::Abort,
        }
    }
}

pub async fn execute(args: RepairArgs, config_path: &Path) -> Result<u8> {
    let mut config = load_config(config_path)?;
    if let Some(max) = args.max_attempts {
        config.repair.max_attempts = max;
    }
    if let Some(concurrency) = args.concurrency {
        config.repair.concurrency = concurrency;
    }
    if let Some(policy) = args.correlation_policy {
        config.repair.correlation_policy = policy.into();
    }
    if let Some(report) = args.report {
        config.paths.report = report;
    }

    let client = completion_client(&config)?;
    let runner = test_runner(&config, args.stream)?;

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing repairs in flight");
            ctrl_c.cancel();
        }
    });

    info!("Repairing failures from {:?}", config.paths.report);
    let orchestrator = RepairOrchestrator::new(config, client, Arc::new(runner))?
        .with_cancellation(token);
    let summary = orchestrator.run().await.context("Repair run failed")?;

    if args.format == OutputFormat::Json {
        print_json(&summary)?;
    } else {
        print!("{}", summary);
        println!();
        match summary.verdict {
            Verdict::Converged => println!("✅ All repaired scripts pass"),
            Verdict::Exhausted => println!("❌ Scripts still failing after {} attempt(s)", summary.attempts_used),
            Verdict::Cancelled => println!("⚠️  Repair cancelled"),
        }
    }

    Ok(match summary.verdict {
        Verdict::Converged => ExitCodes::SUCCESS,
        Verdict::Exhausted => ExitCodes::TESTS_FAILED,
        Verdict::Cancelled => ExitCodes::CANCELLED,
    })
}
