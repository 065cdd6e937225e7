//! Generate-cases command - Design test cases from UI snapshots.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use heal_core::CaseGenerator;

use super::{completion_client, load_config, print_json, OutputFormat};
use crate::ExitCodes;

#[derive(Args)]
pub struct GenerateCasesArgs {
    /// Snapshot directory (overrides paths.snapshots)
    #[arg(long)]
    snapshots: Option<PathBuf>,

    /// Case store to write (overrides paths.cases)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Overwrite an existing case store
    #[arg(short, long)]
    force: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn execute(args: GenerateCasesArgs, config_path: &Path) -> Result<u8> {
    let config = load_config(config_path)?;
    let snapshots = args.snapshots.unwrap_or(config.paths.snapshots.clone());
    let out = args.out.unwrap_or(config.paths.cases.clone());

    if out.exists() && !args.force {
        anyhow::bail!(
            "Case store already exists at {:?}. Use --force to overwrite.",
            out
        );
    }

    let client = completion_client(&config)?;
    let cases = CaseGenerator::new(client)
        .with_timeout(config.llm_timeout())
        .generate(&snapshots, &out)
        .await
        .context("Failed to generate test cases")?;

    if args.format == OutputFormat::Json {
        print_json(&cases)?;
    } else {
        println!("✅ Wrote {} test case(s) to {}", cases.len(), out.display());
        for (i, case) in cases.iter().enumerate() {
            println!("   {}. {} ({} steps)", i + 1, case.display_name(i + 1), case.steps.len());
        }
    }

    Ok(ExitCodes::SUCCESS)
}
