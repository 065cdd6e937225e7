//! Data models for test cases.

use serde::{Deserialize, Serialize};

/// A structured UI scenario that a browser-automation script is generated from.
///
/// Cases carry no identifier of their own: a case is addressed by its 1-based
/// position in the store, which is assigned by generation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TestCase {
    /// Scenario name. Generated stores sometimes call this `scene`.
    #[serde(alias = "scene", default)]
    pub name: String,
    /// Optional longer description of the scenario.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered step descriptions.
    #[serde(default)]
    pub steps: Vec<String>,
    /// Page the scenario starts from.
    #[serde(alias = "url", default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    /// What a passing run should observe.
    #[serde(alias = "expected", default, skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
}

impl TestCase {
    /// Create a new case with the given name and no steps.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a step.
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Set the target URL.
    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    /// Set the expected result.
    pub fn with_expected_result(mut self, expected: impl Into<String>) -> Self {
        self.expected_result = Some(expected.into());
        self
    }

    /// A case without steps cannot be turned into a script.
    pub fn is_actionable(&self) -> bool {
        self.steps.iter().any(|s| !s.trim().is_empty())
    }

    /// Name to show in logs, falling back to the ordinal for unnamed cases.
    pub fn display_name(&self, ordinal: usize) -> String {
        if self.name.trim().is_empty() {
            format!("test_case_{}", ordinal)
        } else {
            self.name.trim().to_string()
        }
    }
}
