//! Requirement extraction from product requirement documents.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use heal_llm::CompletionService;
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::generate::complete_within;
use crate::prompt::requirement_messages;
use crate::sanitize::strip_fences;

/// Strip a list marker (`1.`, `2)`, `-`, `*`, `•`) from the start of a line.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    line
}

/// One requirement per non-empty line of the reply, list markers removed.
pub fn parse_requirements(reply: &str) -> Vec<String> {
    strip_fences(reply)
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render requirements as a numbered list.
pub fn format_requirements(requirements: &[String]) -> String {
    requirements
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n", i + 1, r))
        .collect()
}

/// Turns a requirement document into a list of testable requirements.
pub struct RequirementExtractor {
    service: Arc<dyn CompletionService>,
    timeout: Duration,
}

impl RequirementExtractor {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            timeout: Duration::from_secs(heal_llm::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask for the requirements in `document`.
    pub async fn extract(&self, document: &str) -> CoreResult<Vec<String>> {
        if document.trim().is_empty() {
            return Err(CoreError::Generation("requirement document is empty".to_string()));
        }

        let messages = requirement_messages(document);
        debug!("Requirement prompt is {} chars", messages.iter().map(|m| m.content.len()).sum::<usize>());
        let reply = complete_within(self.service.as_ref(), &messages, self.timeout)
            .await
            .map_err(CoreError::Generation)?;

        let requirements = parse_requirements(&reply);
        if requirements.is_empty() {
            return Err(CoreError::Generation("reply contained no requirements".to_string()));
        }
        info!("Extracted {} requirement(s)", requirements.len());
        Ok(requirements)
    }

    /// Read `document`, extract its requirements and write them to `out`.
    pub async fn extract_file(&self, document: &Path, out: &Path) -> CoreResult<Vec<String>> {
        let text = fs::read_to_string(document).map_err(|source| CoreError::Artifact {
            path: document.to_path_buf(),
            source,
        })?;
        let requirements = self.extract(&text).await?;

        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CoreError::Artifact {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(out, format_requirements(&requirements)).map_err(|source| CoreError::Artifact {
            path: out.to_path_buf(),
            source,
        })?;
        info!("Wrote requirements to {:?}", out);
        Ok(requirements)
    }
}
