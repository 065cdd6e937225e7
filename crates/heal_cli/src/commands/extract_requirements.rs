//! Extract-requirements command - Turn a requirement document into a test checklist.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use heal_core::RequirementExtractor;

use super::{completion_client, load_config, print_json, OutputFormat};
use crate::ExitCodes;

#[derive(Args)]
pub struct ExtractRequirementsArgs {
    /// Requirement document to read
    prd: PathBuf,

    /// File to write the numbered requirements to
    #[arg(short, long, default_value = "requirements_extracted.txt")]
    out: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn execute(args: ExtractRequirementsArgs, config_path: &Path) -> Result<u8> {
    let config = load_config(config_path)?;
    let client = completion_client(&config)?;

    let requirements = RequirementExtractor::new(client)
        .with_timeout(config.llm_timeout())
        .extract_file(&args.prd, &args.out)
        .await
        .with_context(|| format!("Failed to extract requirements from {:?}", args.prd))?;

    if args.format == OutputFormat::Json {
        print_json(&requirements)?;
    } else {
        println!(
            "✅ Wrote {} requirement(s) to {}",
            requirements.len(),
            args.out.display()
        );
        for (i, requirement) in requirements.iter().enumerate() {
            println!("   {}. {}", i + 1, requirement);
        }
    }

    Ok(ExitCodes::SUCCESS)
}
