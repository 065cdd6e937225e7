//! Result of a repair run.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::artifacts::ArtifactStatus;
use crate::failures::FailureKind;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No failures remain.
    Converged,
    /// Failures remain after the last allowed attempt.
    Exhausted,
    /// Stopped on request.
    Cancelled,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::Exhausted => "exhausted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to one script during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutcome {
    /// Script id as first reported
    pub script_id: String,
    /// 1-based case ordinal, when the script maps to a case
    pub ordinal: Option<usize>,
    pub status: ArtifactStatus,
    pub last_failure: Option<FailureKind>,
    /// Repairs promoted to the live script
    pub repairs: u32,
    /// Backups written for this script, oldest first
    pub backups: Vec<PathBuf>,
    /// Why the script ended where it did, for abandoned or unrepaired scripts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ScriptOutcome {
    pub fn new(script_id: impl Into<String>) -> Self {
        let script_id = script_id.into();
        Self {
            ordinal: heal_cases::parse_ordinal(&script_id),
            script_id,
            status: ArtifactStatus::Generated,
            last_failure: None,
            repairs: 0,
            backups: Vec::new(),
            reason: None,
        }
    }

    /// File-name key of the script.
    pub fn key(&self) -> &str {
        heal_cases::script_file_name(&self.script_id)
    }

    /// Move to `status` when the lifecycle allows it. Returns whether the
    /// status changed.
    pub fn advance(&mut self, status: ArtifactStatus) -> bool {
        if self.status == status {
            return false;
        }
        if !self.status.can_transition_to(status) {
            debug!(
                "Ignoring {} -> {} for {}",
                self.status, status, self.script_id
            );
            return false;
        }
        self.status = status;
        true
    }

    pub fn abandon(&mut self, reason: impl Into<String>) {
        if self.advance(ArtifactStatus::Abandoned) {
            self.reason = Some(reason.into());
        }
    }

    pub fn is_abandoned(&self) -> bool {
        self.status == ArtifactStatus::Abandoned
    }
}

/// Summary of a repair run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealSummary {
    pub run_id: Uuid,
    pub verdict: Verdict,
    pub attempts_used: u32,
    pub max_attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Every script seen failing, in order of first appearance
    pub scripts: Vec<ScriptOutcome>,
}

impl HealSummary {
    pub fn is_converged(&self) -> bool {
        self.verdict == Verdict::Converged
    }

    pub fn abandoned(&self) -> impl Iterator<Item = &ScriptOutcome> {
        self.scripts.iter().filter(|s| s.is_abandoned())
    }

    pub fn script(&self, script_id: &str) -> Option<&ScriptOutcome> {
        let key = heal_cases::script_file_name(script_id);
        self.scripts.iter().find(|s| s.key() == key)
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

impl fmt::Display for HealSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Repair run {} {} after {} of {} attempts ({} ms)",
            self.run_id,
            self.verdict,
            self.attempts_used,
            self.max_attempts,
            self.duration_ms()
        )?;

        if self.scripts.is_empty() {
            return writeln!(f, "  no failing scripts");
        }

        let width = self.scripts.iter().map(|s| s.key().len()).max().unwrap_or(0);
        for script in &self.scripts {
            let case = script
                .ordinal
                .map(|n| format!("case #{}", n))
                .unwrap_or_else(|| "no case".to_string());
            write!(
                f,
                "  {:<width$}  {:<9}  {}, {} repair(s)",
                script.key(),
                script.status.as_str(),
                case,
                script.repairs,
                width = width
            )?;
            if let Some(kind) = script.last_failure {
                write!(f, ", last failure {}", kind)?;
            }
            if let Some(reason) = &script.reason {
                write!(f, ": {}", reason)?;
            }
            writeln!(f)?;
        }

        let abandoned = self.abandoned().count();
        if abandoned > 0 {
            writeln!(f, "  {} script(s) abandoned", abandoned)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(scripts: Vec<ScriptOutcome>) -> HealSummary {
        let now = Utc::now();
        HealSummary {
            run_id: Uuid::new_v4(),
            verdict: Verdict::Exhausted,
            attempts_used: 2,
            max_attempts: 2,
            started_at: now,
            finished_at: now,
            scripts,
        }
    }

    #[test]
    fn test_outcome_lifecycle() {
        let mut outcome = ScriptOutcome::new("scripts/case_4.py");
        assert_eq!(outcome.ordinal, Some(4));
        assert_eq!(outcome.key(), "case_4.py");

        assert!(outcome.advance(ArtifactStatus::Failed));
        assert!(!outcome.advance(ArtifactStatus::Verified));
        assert!(outcome.advance(ArtifactStatus::Healing));
        assert!(outcome.advance(ArtifactStatus::Healed));
        assert!(outcome.advance(ArtifactStatus::Verified));

        outcome.abandon("gone");
        assert!(outcome.is_abandoned());
        assert_eq!(outcome.reason.as_deref(), Some("gone"));

        outcome.abandon("again");
        assert_eq!(outcome.reason.as_deref(), Some("gone"));
    }

    #[test]
    fn test_display_lists_scripts() {
        let mut a = ScriptOutcome::new("case_1.py");
        a.advance(ArtifactStatus::Failed);
        a.last_failure = Some(FailureKind::Syntax);
        let mut b = ScriptOutcome::new("orphan.py");
        b.abandon("no test case for script");

        let text = summary(vec![a, b]).to_string();
        assert!(text.contains("exhausted after 2 of 2 attempts"));
        assert!(text.contains("case_1.py"));
        assert!(text.contains("last failure syntax"));
        assert!(text.contains("orphan.py"));
        assert!(text.contains("no case"));
        assert!(text.contains("1 script(s) abandoned"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(summary(vec![ScriptOutcome::new("case_2.py")])).unwrap();
        assert_eq!(json["verdict"], "exhausted");
        assert_eq!(json["scripts"][0]["ordinal"], 2);
        assert_eq!(json["scripts"][0]["status"], "generated");
        assert!(json["scripts"][0].get("reason").is_none());
    }
}
