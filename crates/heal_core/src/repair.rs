//! Repair requester.
//!
//! Asks the completion service once for a repaired script and passes the
//! answer through the sanitizer. Nothing here returns an error: every way a
//! request can go wrong ends as "no candidate".

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use heal_cases::TestCase;
use heal_llm::{CompletionService, LlmError};
use tracing::{debug, info, warn};

use crate::failures::FailureRecord;
use crate::prompt::repair_messages;
use crate::sanitize::{strip_fences, Sanitizer, SyntaxDiagnostic};

/// Why no usable candidate came back.
#[derive(Debug)]
pub enum RepairRejection {
    /// The service returned an error.
    Service(LlmError),
    /// The request exceeded the deadline.
    TimedOut(Duration),
    /// The reply held no code.
    Empty,
    /// The sanitized reply does not parse.
    Invalid(SyntaxDiagnostic),
}

impl fmt::Display for RepairRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(e) => write!(f, "completion service error: {}", e),
            Self::TimedOut(d) => write!(f, "no reply within {} seconds", d.as_secs()),
            Self::Empty => write!(f, "reply contained no code"),
            Self::Invalid(diag) => write!(f, "repaired script is not valid Python ({})", diag),
        }
    }
}

/// Builds repair requests and checks what comes back.
#[derive(Clone)]
pub struct RepairRequester {
    service: Arc<dyn CompletionService>,
    sanitizer: Sanitizer,
    timeout: Duration,
    max_detail_chars: usize,
}

impl RepairRequester {
    pub fn new(service: Arc<dyn CompletionService>, sanitizer: Sanitizer) -> Self {
        Self {
            service,
            sanitizer,
            timeout: Duration::from_secs(heal_llm::DEFAULT_TIMEOUT_SECS),
            max_detail_chars: 4000,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_detail_chars(mut self, max: usize) -> Self {
        self.max_detail_chars = max;
        self
    }

    /// Request one repair and report why it was unusable, if it was.
    pub async fn attempt_repair(
        &self,
        original: &str,
        case: &TestCase,
        failure: &FailureRecord,
    ) -> Result<String, RepairRejection> {
        let messages = repair_messages(
            &failure.script_id,
            case,
            original,
            failure.kind,
            &failure.detail,
            self.max_detail_chars,
        );
        debug!(
            "Repair prompt for {} is {} chars",
            failure.script_id,
            messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let completion = match tokio::time::timeout(self.timeout, self.service.complete(&messages)).await {
            Err(_) => return Err(RepairRejection::TimedOut(self.timeout)),
            Ok(Err(e)) => return Err(RepairRejection::Service(e)),
            Ok(Ok(completion)) => completion,
        };
        debug!(
            "Completion from {} is {} chars",
            completion.model,
            completion.content.len()
        );

        if strip_fences(&completion.content).trim().is_empty() {
            return Err(RepairRejection::Empty);
        }
        let sanitized = self.sanitizer.sanitize(&completion.content);
        match sanitized.diagnostic {
            Some(diag) => Err(RepairRejection::Invalid(diag)),
            None => Ok(sanitized.script),
        }
    }

    /// Request one repair; `None` when no usable candidate came back.
    pub async fn request_repair(
        &self,
        original: &str,
        case: &TestCase,
        failure: &FailureRecord,
    ) -> Option<String> {
        match self.attempt_repair(original, case, failure).await {
            Ok(script) => {
                info!("Received repair for {}", failure.script_id);
                Some(script)
            }
            Err(rejection) => {
                warn!("No repair for {}: {}", failure.script_id, rejection);
                None
            }
        }
    }
}
