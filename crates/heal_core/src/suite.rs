//! Full test-suite runs that seed the report artifact.

use std::fs;
use std::path::{Path, PathBuf};

use heal_runner::{discover_scripts, RunOutcome, TestRunner};
use tracing::{error, info, warn};

use crate::config::HealConfig;
use crate::error::{CoreError, CoreResult};
use crate::failures::{extract_failures, FailureSet};

/// Result of running every live script.
#[derive(Debug)]
pub struct SuiteRun {
    pub scripts: Vec<PathBuf>,
    /// `None` when there was nothing to run
    pub outcome: Option<RunOutcome>,
    pub failures: FailureSet,
}

impl SuiteRun {
    pub fn passed(&self) -> bool {
        self.outcome.as_ref().map_or(true, |o| o.passed())
    }
}

/// Overwrite the report artifact, creating its directory.
pub fn write_report(path: &Path, output: &str) -> CoreResult<()> {
    let report_error = |source| CoreError::Report {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(report_error)?;
    }
    fs::write(path, output).map_err(|source| {
        error!("Cannot write report {:?}: {}", path, source);
        report_error(source)
    })
}

/// Run every script matching `runner.script_glob` and write the report.
pub async fn run_suite(config: &HealConfig, runner: &dyn TestRunner) -> CoreResult<SuiteRun> {
    let scripts = discover_scripts(&config.paths.scripts, &config.runner.script_glob)?;
    if scripts.is_empty() {
        warn!(
            "No scripts matching {} in {:?}",
            config.runner.script_glob, config.paths.scripts
        );
        write_report(&config.paths.report, "")?;
        return Ok(SuiteRun {
            scripts,
            outcome: None,
            failures: FailureSet::new(),
        });
    }

    info!("Running {} script(s) with {}", scripts.len(), runner.describe());
    let outcome = runner.run(&scripts).await?;
    let output = outcome.combined_output();
    write_report(&config.paths.report, &output)?;

    let failures = extract_failures(&output);
    info!(
        "Test run {}; {} failing script(s)",
        outcome.status_line(),
        failures.len()
    );

    Ok(SuiteRun {
        scripts,
        outcome: Some(outcome),
        failures,
    })
}
