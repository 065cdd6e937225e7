//! Failure extraction from test-run reports.
//!
//! A report is the combined output of one pytest run. Two kinds of markers
//! start a failure: per-test markers (`FAILED path.py::test - ...`,
//! `ERROR path.py::test - ...`) and collection markers for scripts that
//! could not be loaded (`ERROR collecting path.py`, possibly inside an
//! underscore banner, or `ERROR path.py - ...` in the short summary).
//!
//! Each marker's detail runs until the next separator line (`===` or
//! `___`), the next marker, or the end of the report.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Lines of output kept when a failed run names no script.
const UNCLAIMED_TAIL_LINES: usize = 40;

/// Failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Syntax,
    Runtime,
    Assertion,
    CollectionError,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Runtime => "runtime",
            Self::Assertion => "assertion",
            Self::CollectionError => "collection-error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One failing script as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Script path as printed in the report, without any `::test` suffix.
    pub script_id: String,
    pub kind: FailureKind,
    /// Full detail text; truncated only when sent to the completion service.
    pub detail: String,
}

impl FailureRecord {
    /// File name of the script, the key used to track it across runs.
    pub fn script_name(&self) -> &str {
        script_key(&self.script_id)
    }
}

/// File-name key for a script id.
pub fn script_key(script_id: &str) -> &str {
    heal_cases::script_file_name(script_id)
}

/// Failures of one report, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSet {
    records: Vec<FailureRecord>,
}

impl FailureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record unless the script is already present.
    pub fn insert(&mut self, record: FailureRecord) -> bool {
        if self.contains(&record.script_id) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Look up by script id or file name.
    pub fn get(&self, script_id: &str) -> Option<&FailureRecord> {
        let key = script_key(script_id);
        self.records.iter().find(|r| r.script_name() == key)
    }

    pub fn contains(&self, script_id: &str) -> bool {
        self.get(script_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FailureRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.script_id.as_str()).collect()
    }

    /// Keep only records matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&FailureRecord) -> bool) {
        self.records.retain(keep);
    }

    /// Records for a run that failed without naming any script: every
    /// script in the run is charged with an `unknown` failure carrying the
    /// tail of the output.
    pub fn attribute_unclaimed<S: AsRef<str>>(scripts: &[S], output: &str) -> Self {
        let lines: Vec<&str> = output.lines().collect();
        let tail = lines[lines.len().saturating_sub(UNCLAIMED_TAIL_LINES)..].join("\n");

        let mut set = Self::new();
        for script in scripts {
            set.insert(FailureRecord {
                script_id: script.as_ref().to_string(),
                kind: FailureKind::Unknown,
                detail: tail.trim().to_string(),
            });
        }
        set
    }
}

impl IntoIterator for FailureSet {
    type Item = FailureRecord;
    type IntoIter = std::vec::IntoIter<FailureRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Script path: ends in `.py`, optionally followed by a healed or backup
/// suffix so those markers are recognized and then excluded.
const PATH: &str = r"(?P<path>\S+?\.py(?:\.healed|\.failed_backup_\S*)?)";

fn collecting_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"^_*\s*ERROR collecting\s+{}\s*_*\s*$", PATH))
            .expect("collection marker pattern is valid")
    })
}

fn test_marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"^(?P<marker>FAILED|ERROR)\s+{}(?P<node>::\S+)?(?P<rest>\s.*)?$",
            PATH
        ))
        .expect("failure marker pattern is valid")
    })
}

fn assertion_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)AssertionError|^\s*(?:E\s+|>\s*)?assert\s")
            .expect("assertion pattern is valid")
    })
}

struct Marker {
    path: String,
    collection: bool,
    rest: String,
}

fn parse_marker(line: &str) -> Option<Marker> {
    let line = line.trim_end();

    if let Some(caps) = collecting_pattern().captures(line) {
        return Some(Marker {
            path: caps["path"].to_string(),
            collection: true,
            rest: String::new(),
        });
    }

    let caps = test_marker_pattern().captures(line)?;
    let rest = caps
        .name("rest")
        .map(|m| m.as_str().trim())
        .unwrap_or_default();
    let rest = rest.strip_prefix("- ").unwrap_or(rest).trim().to_string();

    Some(Marker {
        path: caps["path"].to_string(),
        // A module-level ERROR in the short summary is a collection failure
        collection: &caps["marker"] == "ERROR" && caps.name("node").is_none(),
        rest,
    })
}

fn is_separator(line: &str) -> bool {
    line.starts_with("===") || line.starts_with("___")
}

/// Whether a script id names a repair output or backup rather than a script.
pub fn is_artifact_id(script_id: &str) -> bool {
    script_id.ends_with(".healed") || script_id.contains(".failed_backup_")
}

/// Classify a failure from its marker kind and detail text.
pub fn classify(detail: &str, collection: bool) -> FailureKind {
    if ["SyntaxError", "IndentationError", "TabError"]
        .iter()
        .any(|k| detail.contains(k))
    {
        FailureKind::Syntax
    } else if collection {
        FailureKind::CollectionError
    } else if assertion_pattern().is_match(detail) {
        FailureKind::Assertion
    } else if detail.trim().is_empty() {
        FailureKind::Unknown
    } else {
        FailureKind::Runtime
    }
}

/// Extract failures from report text.
pub fn extract_failures(report: &str) -> FailureSet {
    let lines: Vec<&str> = report.lines().collect();
    let mut set = FailureSet::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(marker) = parse_marker(lines[i]) else {
            i += 1;
            continue;
        };

        let mut detail_lines: Vec<&str> = Vec::new();
        if !marker.rest.is_empty() {
            detail_lines.push(&marker.rest);
        }
        i += 1;
        while i < lines.len() && !is_separator(lines[i]) && parse_marker(lines[i]).is_none() {
            detail_lines.push(lines[i]);
            i += 1;
        }

        if is_artifact_id(&marker.path) {
            debug!("Ignoring failure of repair artifact {}", marker.path);
            continue;
        }

        let detail = detail_lines.join("\n").trim().to_string();
        let kind = classify(&detail, marker.collection);
        if set.insert(FailureRecord {
            script_id: marker.path.clone(),
            kind,
            detail,
        }) {
            debug!("Found {} failure in {}", kind, marker.path);
        }
    }

    set
}

/// Extract failures from a report file. A missing or unreadable report has
/// no failures.
pub fn extract_failures_from_file(path: &Path) -> FailureSet {
    match std::fs::read(path) {
        Ok(bytes) => extract_failures(&String::from_utf8_lossy(&bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No report at {:?}", path);
            FailureSet::new()
        }
        Err(e) => {
            warn!("Could not read report {:?}: {}", path, e);
            FailureSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const REPORT: &str = "\
============================= test session starts ==============================
collected 2 items / 1 error

==================================== ERRORS ====================================
___________ ERROR collecting playwright_scripts/test_playwright_1.py ___________
E     File \"playwright_scripts/test_playwright_1.py\", line 10
E       page.click('#submit')
E   IndentationError: unexpected indent
=================================== FAILURES ===================================
___________________________________ test_search ________________________________
    def test_search(page):
>       expect(page.locator('#results')).to_have_count(3)
E       AssertionError: Locator expected to have count '3'
=========================== short test summary info ============================
FAILED playwright_scripts/test_playwright_2.py::test_search - AssertionError: Locator expected to have count '3'
ERROR playwright_scripts/test_playwright_1.py - IndentationError: unexpected indent
FAILED playwright_scripts/test_playwright_3.py::test_nav - playwright._impl._errors.TimeoutError: Timeout 30000ms exceeded.
========================= 2 failed, 1 error in 31.02s ==========================
";

    #[test]
    fn test_extract_report() {
        let set = extract_failures(REPORT);
        assert_eq!(
            set.ids(),
            vec![
                "playwright_scripts/test_playwright_1.py",
                "playwright_scripts/test_playwright_2.py",
                "playwright_scripts/test_playwright_3.py",
            ]
        );

        let first = set.get("test_playwright_1.py").unwrap();
        assert_eq!(first.kind, FailureKind::Syntax);
        assert!(first.detail.contains("line 10"));

        assert_eq!(set.get("test_playwright_2.py").unwrap().kind, FailureKind::Assertion);
        assert_eq!(set.get("test_playwright_3.py").unwrap().kind, FailureKind::Runtime);
    }

    #[test]
    fn test_indentation_error_scenario() {
        let set = extract_failures("FAILED scripts/case_2.py - IndentationError line 10\n");
        let record = set.get("scripts/case_2.py").unwrap();

        assert_eq!(record.script_id, "scripts/case_2.py");
        assert_eq!(record.kind, FailureKind::Syntax);
        assert_eq!(record.detail, "IndentationError line 10");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let report = "FAILED a/case_1.py::t1 - AssertionError: x\nFAILED a/case_1.py::t2 - ValueError: y\n";
        let set = extract_failures(report);

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a/case_1.py").unwrap().kind, FailureKind::Assertion);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(extract_failures(REPORT), extract_failures(REPORT));
    }

    #[test]
    fn test_detail_spans_lines_until_separator() {
        let report = "FAILED s/case_1.py::t\nTraceback:\n  ValueError: bad\n=== 1 failed ===\nnoise\n";
        let set = extract_failures(report);
        assert_eq!(set.get("case_1.py").unwrap().detail, "Traceback:\n  ValueError: bad");
    }

    #[test]
    fn test_healed_and_backup_excluded() {
        let report = "FAILED s/case_1.py.healed - x\nFAILED s/case_1.py.failed_backup_1 - y\nFAILED s/case_2.py - z\n";
        let set = extract_failures(report);
        assert_eq!(set.ids(), vec!["s/case_2.py"]);
    }

    #[test]
    fn test_collection_and_unknown() {
        let set = extract_failures("ERROR collecting s/case_4.py\nModuleNotFoundError: foo\nFAILED s/case_5.py\n");
        assert_eq!(set.get("case_4.py").unwrap().kind, FailureKind::CollectionError);
        assert_eq!(set.get("case_5.py").unwrap().kind, FailureKind::Unknown);
    }

    #[test]
    fn test_windows_paths() {
        let set = extract_failures("FAILED C:\\runs\\test_playwright_3.py::test_a - Error: boom\n");
        assert_eq!(set.ids(), vec!["C:\\runs\\test_playwright_3.py"]);
        assert!(set.contains("test_playwright_3.py"));
    }

    #[test]
    fn test_no_markers() {
        assert!(extract_failures("").is_empty());
        assert!(extract_failures("===== 3 passed in 1.2s =====\n").is_empty());
        assert!(extract_failures("scripts/case_1.py::test FAILED [100%]\n").is_empty());
    }

    #[test]
    fn test_missing_report_is_empty() {
        let dir = tempdir().unwrap();
        assert!(extract_failures_from_file(&dir.path().join("absent.log")).is_empty());
    }

    #[test]
    fn test_attribute_unclaimed() {
        let output = (1..=100).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let set = FailureSet::attribute_unclaimed(&["s/case_1.py", "s/case_2.py"], &output);

        assert_eq!(set.len(), 2);
        let record = set.get("case_2.py").unwrap();
        assert_eq!(record.kind, FailureKind::Unknown);
        assert!(record.detail.starts_with("line 61"));
        assert!(record.detail.ends_with("line 100"));
    }
}
