//! Sanitize command - Clean up and check a single script.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use heal_core::{Sanitizer, SyntaxDiagnostic};

use super::{load_config, print_json, OutputFormat};
use crate::ExitCodes;

#[derive(Args)]
pub struct SanitizeArgs {
    /// Script or raw model output to sanitize
    file: PathBuf,

    /// Overwrite the file with the sanitized script when it is valid
    #[arg(short, long)]
    write: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Serialize)]
struct SanitizeResult<'a> {
    file: &'a Path,
    valid: bool,
    changed: bool,
    written: bool,
    diagnostic: Option<&'a SyntaxDiagnostic>,
}

pub async fn execute(args: SanitizeArgs, config_path: &Path) -> Result<u8> {
    let config = load_config(config_path)?;
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {:?}", args.file))?;

    let sanitizer = Sanitizer::new(config.repair.required_imports.clone());
    let sanitized = sanitizer.sanitize(&raw);
    let changed = sanitized.script != raw;

    let written = args.write && sanitized.is_valid() && changed;
    if written {
        fs::write(&args.file, &sanitized.script)
            .with_context(|| format!("Failed to write {:?}", args.file))?;
        info!("Rewrote {:?}", args.file);
    }

    if args.format == OutputFormat::Json {
        print_json(&SanitizeResult {
            file: &args.file,
            valid: sanitized.is_valid(),
            changed,
            written,
            diagnostic: sanitized.diagnostic.as_ref(),
        })?;
    } else {
        if !args.write {
            print!("{}", sanitized.script);
        }
        match &sanitized.diagnostic {
            None if written => eprintln!("✅ {} sanitized and valid", args.file.display()),
            None => eprintln!("✅ {} is valid", args.file.display()),
            Some(diag) => eprintln!("❌ {}: {}", args.file.display(), diag),
        }
    }

    if sanitized.is_valid() {
        Ok(ExitCodes::SUCCESS)
    } else {
        Ok(ExitCodes::TESTS_FAILED)
    }
}
