//! Init command - Write a default configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use heal_core::HealConfig;

use crate::ExitCodes;

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(short, long)]
    force: bool,
}

pub async fn execute(args: InitArgs, config_path: &Path) -> Result<u8> {
    info!("Initializing selfheal at {:?}", config_path);

    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Configuration already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    let config = HealConfig::default();
    let text = config.to_toml()?;

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(config_path, text)
        .with_context(|| format!("Failed to write {:?}", config_path))?;

    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    for dir in [&config.paths.scripts, &config.paths.snapshots] {
        fs::create_dir_all(base.join(dir))?;
    }

    println!("✅ selfheal initialized");
    println!();
    println!("Created:");
    println!("  📄 {}", config_path.display());
    println!("  📁 {}/", config.paths.scripts.display());
    println!("  📁 {}/", config.paths.snapshots.display());
    println!();
    println!("Next steps:");
    println!("  export {}=...", config.llm.api_key_env);
    println!("  heal generate-cases && heal generate-scripts && heal run-tests && heal repair");

    Ok(ExitCodes::SUCCESS)
}
