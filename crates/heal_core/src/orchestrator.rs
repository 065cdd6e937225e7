//! Repair orchestrator.
//!
//! Drives the repair loop over the report artifact:
//!
//! ```text
//! Idle -> Scanning -> Repairing -> Verifying -> Scanning -> ...
//!            |            |
//!            |            +-- nothing repaired --> Scanning
//!            +-- no failures --> Converged
//!            +-- budget used --> Exhausted
//!            +-- cancelled ----> Cancelled
//! ```
//!
//! Each pass through Repairing is one attempt. The budget counts attempts
//! whether or not they produced a repair, so a run always ends after at
//! most `max_attempts` attempts.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use heal_cases::{find_case, CaseStore};
use heal_llm::CompletionService;
use heal_runner::TestRunner;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artifacts::{ArtifactStatus, ArtifactStore};
use crate::config::{CorrelationPolicy, HealConfig};
use crate::error::{CoreError, CoreResult};
use crate::failures::{extract_failures, extract_failures_from_file, FailureRecord, FailureSet};
use crate::repair::RepairRequester;
use crate::sanitize::Sanitizer;
use crate::suite::write_report;
use crate::summary::{HealSummary, ScriptOutcome, Verdict};

/// Reason recorded for scripts left behind by a productive attempt.
pub const NOT_REVERIFIED: &str = "no usable repair; not re-verified";

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    Repairing,
    Verifying,
    Converged,
    Exhausted,
    Cancelled,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted | Self::Cancelled)
    }

    fn verdict(&self) -> Option<Verdict> {
        match self {
            Self::Converged => Some(Verdict::Converged),
            Self::Exhausted => Some(Verdict::Exhausted),
            Self::Cancelled => Some(Verdict::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Repairing => "repairing",
            Self::Verifying => "verifying",
            Self::Converged => "converged",
            Self::Exhausted => "exhausted",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// Result of trying to repair one script within an attempt.
#[derive(Debug)]
enum ScriptRepair {
    /// Repair promoted to the live script.
    Repaired { live: PathBuf, backup: PathBuf },
    /// No usable candidate this attempt.
    Unrepaired,
    /// The script cannot be repaired in this run.
    Abandoned(String),
    /// Not started because the run was cancelled.
    Skipped,
}

/// Scripts seen during a run, in order of first appearance.
#[derive(Debug, Default)]
struct Ledger {
    scripts: Vec<ScriptOutcome>,
}

impl Ledger {
    fn entry(&mut self, script_id: &str) -> &mut ScriptOutcome {
        let key = heal_cases::script_file_name(script_id);
        match self.scripts.iter().position(|s| s.key() == key) {
            Some(i) => &mut self.scripts[i],
            None => {
                self.scripts.push(ScriptOutcome::new(script_id));
                let last = self.scripts.len() - 1;
                &mut self.scripts[last]
            }
        }
    }

    fn abandoned(&self) -> HashSet<String> {
        self.scripts
            .iter()
            .filter(|s| s.is_abandoned())
            .map(|s| s.key().to_string())
            .collect()
    }
}

/// Outcome of a verification run that named no failing script.
struct Unclaimed {
    scripts: Vec<String>,
    output: String,
}

/// Runs the repair loop for one workspace.
pub struct RepairOrchestrator {
    config: HealConfig,
    requester: RepairRequester,
    runner: Arc<dyn TestRunner>,
    store: ArtifactStore,
    cancel: CancellationToken,
}

impl RepairOrchestrator {
    pub fn new(
        config: HealConfig,
        completion: Arc<dyn CompletionService>,
        runner: Arc<dyn TestRunner>,
    ) -> CoreResult<Self> {
        config.validate()?;

        let requester = RepairRequester::new(
            completion,
            Sanitizer::new(config.repair.required_imports.clone()),
        )
        .with_timeout(config.llm_timeout())
        .with_max_detail_chars(config.repair.max_detail_chars);
        let store = ArtifactStore::new(&config.paths.scripts, &config.repair.script_prefix);

        Ok(Self {
            config,
            requester,
            runner,
            store,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the run when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &HealConfig {
        &self.config
    }

    fn enter(&self, phase: &mut Phase, next: Phase) {
        debug!("Phase {} -> {}", phase, next);
        *phase = next;
    }

    /// Run the loop until it converges, exhausts its budget or is cancelled.
    pub async fn run(&self) -> CoreResult<HealSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let max_attempts = self.config.repair.max_attempts;
        let report = &self.config.paths.report;

        let mut phase = Phase::Idle;
        info!(
            "Repair run {} started (report {:?}, up to {} attempts)",
            run_id, report, max_attempts
        );

        let cases = CaseStore::load(&self.config.paths.cases).map_err(|e| {
            error!("Cannot load test cases: {}", e);
            CoreError::from(e)
        })?;

        let mut ledger = Ledger::default();
        let mut attempts_used: u32 = 0;
        let mut unclaimed: Option<Unclaimed> = None;

        loop {
            self.enter(&mut phase, Phase::Scanning);
            if self.cancel.is_cancelled() {
                info!("Cancellation requested");
                self.enter(&mut phase, Phase::Cancelled);
                break;
            }

            let mut failures = extract_failures_from_file(report);
            if let Some(run) = unclaimed.take() {
                if failures.is_empty() {
                    warn!(
                        "Verification failed without naming a script; charging {} script(s)",
                        run.scripts.len()
                    );
                    failures = FailureSet::attribute_unclaimed(&run.scripts, &run.output);
                }
            }

            let abandoned = ledger.abandoned();
            failures.retain(|r| !abandoned.contains(r.script_name()));

            for record in failures.iter() {
                let entry = ledger.entry(&record.script_id);
                entry.advance(ArtifactStatus::Failed);
                entry.last_failure = Some(record.kind);
            }

            if failures.is_empty() {
                info!("No failing scripts remain");
                self.enter(&mut phase, Phase::Converged);
                break;
            }
            if attempts_used >= max_attempts {
                warn!(
                    "{} script(s) still failing after {} attempt(s)",
                    failures.len(),
                    attempts_used
                );
                self.enter(&mut phase, Phase::Exhausted);
                break;
            }

            let attempt = attempts_used + 1;
            self.enter(&mut phase, Phase::Repairing);
            info!(
                "Attempt {}/{}: repairing {} script(s)",
                attempt,
                max_attempts,
                failures.len()
            );

            let results = self.repair_batch(&cases, &failures, attempt).await?;
            attempts_used = attempt;

            let mut repaired: Vec<PathBuf> = Vec::new();
            let mut repaired_ids: Vec<String> = Vec::new();
            let mut unrepaired: Vec<String> = Vec::new();

            for (record, result) in failures.iter().zip(results) {
                let entry = ledger.entry(&record.script_id);
                match result {
                    ScriptRepair::Repaired { live, backup } => {
                        entry.advance(ArtifactStatus::Healing);
                        entry.advance(ArtifactStatus::Healed);
                        entry.repairs += 1;
                        entry.backups.push(backup);
                        repaired_ids.push(live.to_string_lossy().into_owned());
                        repaired.push(live);
                    }
                    ScriptRepair::Unrepaired => {
                        entry.advance(ArtifactStatus::Healing);
                        entry.advance(ArtifactStatus::Failed);
                        unrepaired.push(record.script_id.clone());
                    }
                    ScriptRepair::Abandoned(reason) => {
                        warn!("Abandoning {}: {}", record.script_id, reason);
                        entry.abandon(reason);
                    }
                    ScriptRepair::Skipped => {}
                }
            }

            if repaired.is_empty() {
                info!("Attempt {} repaired nothing", attempt);
                continue;
            }

            for script_id in &unrepaired {
                info!("Abandoning {}: {}", script_id, NOT_REVERIFIED);
                ledger.entry(script_id).abandon(NOT_REVERIFIED);
            }

            self.enter(&mut phase, Phase::Verifying);
            info!("Verifying {} repaired script(s)", repaired.len());

            let (passed, output) = match self.runner.run(&repaired).await {
                Ok(outcome) => {
                    info!("Verification {}", outcome.status_line());
                    (outcome.passed(), outcome.combined_output())
                }
                Err(e) => {
                    warn!("Verification run failed: {}", e);
                    (false, e.to_string())
                }
            };
            write_report(report, &output)?;

            if passed {
                for id in &repaired_ids {
                    ledger.entry(id).advance(ArtifactStatus::Verified);
                }
                if self.cancel.is_cancelled() {
                    // Scripts skipped after cancellation were never repaired
                    continue;
                }
                self.enter(&mut phase, Phase::Converged);
                break;
            }

            let still_failing = extract_failures(&output);
            for id in &repaired_ids {
                let status = if still_failing.is_empty() || still_failing.contains(id) {
                    ArtifactStatus::Failed
                } else {
                    ArtifactStatus::Verified
                };
                ledger.entry(id).advance(status);
            }
            if still_failing.is_empty() {
                unclaimed = Some(Unclaimed {
                    scripts: repaired_ids,
                    output,
                });
            }
        }

        let verdict = phase.verdict().unwrap_or(Verdict::Cancelled);
        let summary = HealSummary {
            run_id,
            verdict,
            attempts_used,
            max_attempts,
            started_at,
            finished_at: Utc::now(),
            scripts: ledger.scripts,
        };
        info!(
            "Repair run {} {} after {} attempt(s)",
            run_id, summary.verdict, summary.attempts_used
        );
        Ok(summary)
    }

    /// Repair every failing script, at most `repair.concurrency` at a time.
    /// Results come back in report order.
    async fn repair_batch(
        &self,
        cases: &CaseStore,
        failures: &FailureSet,
        attempt: u32,
    ) -> CoreResult<Vec<ScriptRepair>> {
        stream::iter(failures.iter())
            .map(|failure| self.repair_one(cases, failure, attempt))
            .buffered(self.config.repair.concurrency.max(1))
            .try_collect()
            .await
    }

    async fn repair_one(
        &self,
        cases: &CaseStore,
        failure: &FailureRecord,
        attempt: u32,
    ) -> CoreResult<ScriptRepair> {
        if self.cancel.is_cancelled() {
            debug!("Skipping {}: run cancelled", failure.script_id);
            return Ok(ScriptRepair::Skipped);
        }

        let Some(found) = find_case(&failure.script_id, cases) else {
            return match self.config.repair.correlation_policy {
                CorrelationPolicy::Skip => {
                    Ok(ScriptRepair::Abandoned("no test case for script".to_string()))
                }
                CorrelationPolicy::Abort => {
                    error!("No test case for {}", failure.script_id);
                    Err(CoreError::Correlation(failure.script_id.clone()))
                }
            };
        };

        let live = self.store.locate(&failure.script_id);
        let Some(original) = self.store.read_live(&live)? else {
            return Ok(ScriptRepair::Abandoned(format!(
                "live script not found at {}",
                live.display()
            )));
        };

        debug!(
            "Repairing {} for case #{} ({})",
            failure.script_id, found.ordinal, failure.kind
        );
        let Some(script) = self
            .requester
            .request_repair(&original, found.case, failure)
            .await
        else {
            return Ok(ScriptRepair::Unrepaired);
        };

        let backup = self.store.promote_repair(&live, &script, attempt)?;
        Ok(ScriptRepair::Repaired { live, backup })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_terminal() {
        assert!(Phase::Converged.is_terminal());
        assert!(Phase::Cancelled.is_terminal());
        assert!(!Phase::Verifying.is_terminal());
        assert_eq!(Phase::Exhausted.verdict(), Some(Verdict::Exhausted));
        assert_eq!(Phase::Scanning.verdict(), None);
    }

    #[test]
    fn test_ledger_keys_by_file_name() {
        let mut ledger = Ledger::default();
        ledger.entry("a/case_1.py").advance(ArtifactStatus::Failed);
        ledger.entry("/abs/case_1.py").abandon("x");
        ledger.entry("case_2.py");

        assert_eq!(ledger.scripts.len(), 2);
        assert_eq!(ledger.scripts[0].script_id, "a/case_1.py");
        assert!(ledger.abandoned().contains("case_1.py"));
    }
}
