//! Check-selectors command - Look script selectors up in the page snapshot.
//!
//! Runs without a browser: selectors are matched against the elements the
//! snapshot step recorded, so a miss means "not seen when the UI was
//! captured" rather than "absent from the live page".

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use heal_core::{check_script, load_element_snapshot, SelectorReport, SelectorStatus, PAGE_SNAPSHOT_FILE};
use heal_runner::discover_scripts;

use super::{load_config, print_json, OutputFormat};
use crate::ExitCodes;

#[derive(Args)]
pub struct CheckSelectorsArgs {
    /// Scripts to check (defaults to every script in paths.scripts)
    scripts: Vec<PathBuf>,

    /// Element snapshot to check against
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn execute(args: CheckSelectorsArgs, config_path: &Path) -> Result<u8> {
    let config = load_config(config_path)?;
    let snapshot_path = args
        .snapshot
        .unwrap_or_else(|| config.paths.snapshots.join(PAGE_SNAPSHOT_FILE));
    let snapshot = load_element_snapshot(&snapshot_path);
    if snapshot.is_empty() {
        warn!("No elements recorded in {:?}; selectors cannot be checked", snapshot_path);
    }

    let scripts = if args.scripts.is_empty() {
        discover_scripts(&config.paths.scripts, &config.runner.script_glob)
            .context("Failed to list scripts")?
    } else {
        args.scripts
    };

    let reports = scripts
        .iter()
        .map(|script| check_script(script, &snapshot))
        .collect::<Result<Vec<SelectorReport>, _>>()
        .context("Failed to check selectors")?;
    let missing: usize = reports.iter().map(SelectorReport::not_found).sum();

    if args.format == OutputFormat::Json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            println!("🔍 {}", report.script.display());
            for check in &report.checks {
                let selector = &check.selector;
                match check.status {
                    SelectorStatus::Found(n) => {
                        println!("   [OK] {}: {} (found {})", selector.kind, selector.value, n)
                    }
                    SelectorStatus::NotFound => println!(
                        "   [NOT FOUND] {}: {} (line {})",
                        selector.kind, selector.value, selector.line
                    ),
                    SelectorStatus::Unchecked => {
                        println!("   [SKIPPED] {}: {}", selector.kind, selector.value)
                    }
                }
            }
        }
        println!();
        if missing == 0 {
            println!("✅ Every checkable selector was found");
        } else {
            println!("❌ {} selector(s) not found in the snapshot", missing);
        }
    }

    Ok(if missing == 0 {
        ExitCodes::SUCCESS
    } else {
        ExitCodes::TESTS_FAILED
    })
}
