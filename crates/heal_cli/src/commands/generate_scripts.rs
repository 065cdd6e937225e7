//! Generate-scripts command - Write one Playwright script per test case.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use heal_cases::CaseStore;
use heal_core::{
    load_element_snapshot, ArtifactStore, GeneratedScript, Sanitizer, ScriptGenerator,
    PAGE_SNAPSHOT_FILE,
};

use super::{completion_client, load_config, print_json, OutputFormat};
use crate::ExitCodes;

#[derive(Args)]
pub struct GenerateScriptsArgs {
    /// Replace existing scripts (the old script is backed up)
    #[arg(short, long)]
    force: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Serialize)]
struct ScriptEntry {
    ordinal: usize,
    status: &'static str,
    path: Option<String>,
    reason: Option<String>,
}

impl ScriptEntry {
    fn from_result(ordinal: usize, result: &GeneratedScript) -> Self {
        let (status, path, reason) = match result {
            GeneratedScript::Written(path) => ("written", Some(path.display().to_string()), None),
            GeneratedScript::Invalid { path, diagnostic } => (
                "invalid",
                Some(path.display().to_string()),
                Some(diagnostic.to_string()),
            ),
            GeneratedScript::Skipped(reason) => ("skipped", None, Some(reason.clone())),
            GeneratedScript::Failed(reason) => ("failed", None, Some(reason.clone())),
        };
        Self {
            ordinal,
            status,
            path,
            reason,
        }
    }
}

pub async fn execute(args: GenerateScriptsArgs, config_path: &Path) -> Result<u8> {
    let config = load_config(config_path)?;
    let cases = CaseStore::load(&config.paths.cases).context("Failed to load test cases")?;
    let elements = load_element_snapshot(&config.paths.snapshots.join(PAGE_SNAPSHOT_FILE));

    let client = completion_client(&config)?;
    let generator = ScriptGenerator::new(
        client,
        Sanitizer::new(config.repair.required_imports.clone()),
        ArtifactStore::new(&config.paths.scripts, &config.repair.script_prefix),
    )
    .with_elements(elements)
    .with_timeout(config.llm_timeout())
    .force(args.force);

    let report = generator
        .generate(&cases)
        .await
        .context("Failed to generate scripts")?;

    let entries: Vec<ScriptEntry> = report
        .scripts
        .iter()
        .map(|(ordinal, result)| ScriptEntry::from_result(*ordinal, result))
        .collect();

    if args.format == OutputFormat::Json {
        print_json(&entries)?;
    } else {
        println!("📝 Generated scripts for {} case(s)", entries.len());
        for entry in &entries {
            let icon = match entry.status {
                "written" => "✅",
                "skipped" => "⏭️ ",
                _ => "❌",
            };
            print!("   {} case #{} {}", icon, entry.ordinal, entry.status);
            if let Some(path) = &entry.path {
                print!(" {}", path);
            }
            if let Some(reason) = &entry.reason {
                print!(" ({})", reason);
            }
            println!();
        }
    }

    if report.invalid() + report.failed() > 0 {
        Ok(ExitCodes::TESTS_FAILED)
    } else {
        Ok(ExitCodes::SUCCESS)
    }
}
