//! # heal_core
//!
//! Self-healing repair loop for generated UI tests.
//!
//! When generated Playwright scripts fail, the loop reads the failures from
//! the last test report, asks a completion service for a repaired script,
//! checks the answer, swaps it in, and re-runs only what it repaired. It
//! stops when nothing fails any more or the attempt budget is spent.
//!
//! # Architecture
//!
//! - **Sanitizer**: turns raw model output into a script that parses
//! - **Failures**: extracts per-script failures from a pytest report
//! - **Artifacts**: live scripts, staged repairs and backups on disk
//! - **Repair**: one repair request per failing script
//! - **Orchestrator**: the scan / repair / verify state machine
//! - **Selectors**: browser-free selector checks against the page snapshot
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use heal_core::{HealConfig, RepairOrchestrator};
//! use heal_llm::ChatCompletionClient;
//! use heal_runner::PytestRunner;
//!
//! let config = HealConfig::load("heal.toml")?;
//! let client = ChatCompletionClient::new(config.client_config()?)?;
//! let runner = PytestRunner::new(config.runner_config())?;
//!
//! let orchestrator = RepairOrchestrator::new(config, Arc::new(client), Arc::new(runner))?;
//! let summary = orchestrator.run().await?;
//! println!("{}", summary);
//! ```

pub mod artifacts;
pub mod config;
pub mod error;
pub mod failures;
pub mod generate;
pub mod orchestrator;
pub mod prompt;
pub mod repair;
pub mod requirements;
pub mod sanitize;
pub mod selectors;
pub mod suite;
pub mod summary;

pub use artifacts::{ArtifactStatus, ArtifactStore};
pub use config::{CorrelationPolicy, HealConfig, DEFAULT_CONFIG_FILE};
pub use error::{CoreError, CoreResult};
pub use failures::{extract_failures, extract_failures_from_file, FailureKind, FailureRecord, FailureSet};
pub use generate::{
    load_element_snapshot, CaseGenerator, ElementSnapshot, GeneratedScript, GenerationReport, ScriptGenerator,
    PAGE_SNAPSHOT_FILE,
};
pub use orchestrator::{Phase, RepairOrchestrator};
pub use repair::{RepairRejection, RepairRequester};
pub use requirements::{format_requirements, parse_requirements, RequirementExtractor};
pub use sanitize::{sanitize, Sanitized, Sanitizer, SyntaxDiagnostic};
pub use selectors::{
    check_script, extract_selectors, ScriptSelector, SelectorCheck, SelectorKind, SelectorReport,
    SelectorStatus,
};
pub use suite::{run_suite, write_report, SuiteRun};
pub use summary::{HealSummary, ScriptOutcome, Verdict};
