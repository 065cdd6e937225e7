//! Failures command - Show failures extracted from the report.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use heal_cases::{find_case, CaseStore};
use heal_core::extract_failures_from_file;

use super::{load_config, print_json, OutputFormat};
use crate::ExitCodes;

#[derive(Args)]
pub struct FailuresArgs {
    /// Report file to read (overrides paths.report)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the full failure detail
    #[arg(long)]
    detail: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn execute(args: FailuresArgs, config_path: &Path) -> Result<u8> {
    let config = load_config(config_path)?;
    let report = args.report.unwrap_or(config.paths.report.clone());
    let failures = extract_failures_from_file(&report);

    if args.format == OutputFormat::Json {
        print_json(&failures)?;
        return Ok(ExitCodes::SUCCESS);
    }

    if failures.is_empty() {
        println!("✅ No failures in {}", report.display());
        return Ok(ExitCodes::SUCCESS);
    }

    // Case names are informative only; an unreadable store is not an error here
    let cases = CaseStore::load(&config.paths.cases).ok();

    println!("❌ {} failing script(s) in {}", failures.len(), report.display());
    for failure in failures.iter() {
        let case = cases
            .as_ref()
            .and_then(|store| find_case(&failure.script_id, store))
            .map(|m| format!("case #{}: {}", m.ordinal, m.case.display_name(m.ordinal)))
            .unwrap_or_else(|| "no matching case".to_string());
        println!("   - {} [{}] ({})", failure.script_id, failure.kind, case);

        if args.detail {
            for line in failure.detail.lines() {
                println!("       {}", line);
            }
        } else if let Some(first) = failure.detail.lines().next() {
            println!("       {}", first);
        }
    }

    Ok(ExitCodes::SUCCESS)
}
