//! Selector checks against the element snapshot.
//!
//! Finds the `page.locator`, `page.get_by_label` and `page.get_by_text`
//! calls in a script and looks each selector up among the elements recorded
//! in `page_snapshot.json`, without starting a browser. Lookups approximate
//! Playwright's matching: text and label lookups are case-insensitive
//! substring matches, locators are understood when they are a `text=` or
//! `id=` selector, the snapshot's own selector, or a simple CSS compound
//! (`tag#id[attr="value"]`). Anything else is reported as unchecked.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::generate::ElementSnapshot;

/// Element fields a label can match.
const LABEL_FIELDS: &[&str] = &["text", "name", "id", "placeholder", "aria-label", "label"];

/// Playwright lookup a selector is used with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    Locator,
    GetByLabel,
    GetByText,
}

impl SelectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locator => "locator",
            Self::GetByLabel => "get_by_label",
            Self::GetByText => "get_by_text",
        }
    }

    fn from_method(method: &str) -> Option<Self> {
        match method {
            "locator" => Some(Self::Locator),
            "get_by_label" => Some(Self::GetByLabel),
            "get_by_text" => Some(Self::GetByText),
            _ => None,
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A selector literal found in a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptSelector {
    pub kind: SelectorKind,
    pub value: String,
    /// 1-based line of the call.
    pub line: usize,
}

/// Result of looking a selector up in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "count", rename_all = "snake_case")]
pub enum SelectorStatus {
    Found(usize),
    NotFound,
    /// The snapshot cannot answer for this selector.
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorCheck {
    pub selector: ScriptSelector,
    pub status: SelectorStatus,
}

/// Selector checks for one script.
#[derive(Debug, Clone, Serialize)]
pub struct SelectorReport {
    pub script: PathBuf,
    /// Snapshot pages the selectors were checked against.
    pub pages: Vec<String>,
    pub checks: Vec<SelectorCheck>,
}

impl SelectorReport {
    fn count(&self, pred: impl Fn(&SelectorStatus) -> bool) -> usize {
        self.checks.iter().filter(|c| pred(&c.status)).count()
    }

    pub fn found(&self) -> usize {
        self.count(|s| matches!(s, SelectorStatus::Found(_)))
    }

    pub fn not_found(&self) -> usize {
        self.count(|s| *s == SelectorStatus::NotFound)
    }

    pub fn unchecked(&self) -> usize {
        self.count(|s| *s == SelectorStatus::Unchecked)
    }
}

fn call_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"page\.(locator|get_by_label|get_by_text)\(\s*[rRuU]?(?:"((?:[^"\\\n]|\\.)*)"|'((?:[^'\\\n]|\\.)*)')"#,
        )
        .expect("selector call pattern is valid")
    })
}

fn compound_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<tag>[A-Za-z][A-Za-z0-9-]*)?(?:#(?P<id>[A-Za-z_][\w-]*))?(?P<attrs>(?:\[[^\]]+\])*)$")
            .expect("css compound pattern is valid")
    })
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\[\s*([\w-]+)\s*(?:=\s*(?:"([^"]*)"|'([^']*)'|([^\]\s"']+)))?\s*\]"#)
            .expect("css attribute pattern is valid")
    })
}

fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('"' | '\'' | '\\')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Selector literals passed to `page.locator`, `page.get_by_label` and
/// `page.get_by_text`, in source order.
pub fn extract_selectors(script: &str) -> Vec<ScriptSelector> {
    call_pattern()
        .captures_iter(script)
        .filter_map(|caps| {
            let kind = SelectorKind::from_method(caps.get(1)?.as_str())?;
            let literal = caps.get(2).or_else(|| caps.get(3))?;
            let start = caps.get(0)?.start();
            Some(ScriptSelector {
                kind,
                value: unescape(literal.as_str()),
                line: script[..start].matches('\n').count() + 1,
            })
        })
        .collect()
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn field<'a>(element: &'a Value, key: &str) -> Option<&'a str> {
    element.get(key).and_then(Value::as_str)
}

fn contains_normalized(element: &Value, key: &str, needle: &str) -> bool {
    field(element, key).map_or(false, |v| normalize(v).contains(needle))
}

fn count_matches(elements: &[&Value], pred: impl Fn(&Value) -> bool) -> SelectorStatus {
    match elements.iter().filter(|e| pred(e)).count() {
        0 => SelectorStatus::NotFound,
        n => SelectorStatus::Found(n),
    }
}

fn check_text(elements: &[&Value], value: &str, keys: &[&str]) -> SelectorStatus {
    let needle = normalize(value.trim_matches(&['"', '\''][..]));
    if needle.is_empty() {
        return SelectorStatus::Unchecked;
    }
    count_matches(elements, |e| keys.iter().any(|k| contains_normalized(e, k, &needle)))
}

/// Attribute constraints of a simple CSS compound, or `None` when the
/// selector is anything more complex.
fn parse_compound(selector: &str) -> Option<Vec<(String, Option<String>)>> {
    let caps = compound_pattern().captures(selector.trim())?;
    let mut constraints = Vec::new();

    if let Some(tag) = caps.name("tag") {
        constraints.push(("tag".to_string(), Some(tag.as_str().to_string())));
    }
    if let Some(id) = caps.name("id") {
        constraints.push(("id".to_string(), Some(id.as_str().to_string())));
    }

    let attrs = caps.name("attrs").map_or("", |m| m.as_str());
    let mut parsed = 0;
    for attr in attribute_pattern().captures_iter(attrs) {
        let name = attr.get(1)?.as_str().to_string();
        let value = attr
            .get(2)
            .or_else(|| attr.get(3))
            .or_else(|| attr.get(4))
            .map(|m| m.as_str().to_string());
        constraints.push((name, value));
        parsed += 1;
    }

    // Operators such as `*=` or `^=` leave brackets unparsed
    if parsed != attrs.matches('[').count() || constraints.is_empty() {
        return None;
    }
    Some(constraints)
}

fn check_locator(elements: &[&Value], selector: &str) -> SelectorStatus {
    let selector = selector.trim();
    if let Some(text) = selector.strip_prefix("text=") {
        return check_text(elements, text, &["text"]);
    }
    if let Some(id) = selector.strip_prefix("id=") {
        return count_matches(elements, |e| field(e, "id") == Some(id));
    }
    if elements.iter().any(|e| field(e, "selector") == Some(selector)) {
        return count_matches(elements, |e| field(e, "selector") == Some(selector));
    }

    let Some(constraints) = parse_compound(selector) else {
        return SelectorStatus::Unchecked;
    };
    // An attribute the snapshot never recorded cannot be checked
    let recorded = |key: &str| elements.iter().any(|e| field(e, key).is_some());
    if !constraints.iter().all(|(key, _)| recorded(key)) {
        return SelectorStatus::Unchecked;
    }

    count_matches(elements, |e| {
        constraints.iter().all(|(key, expected)| match (field(e, key), expected) {
            (Some(actual), Some(expected)) if key == "tag" => actual.eq_ignore_ascii_case(expected),
            (Some(actual), Some(expected)) => actual == expected.as_str(),
            (Some(actual), None) => !actual.is_empty(),
            (None, _) => false,
        })
    })
}

/// Look one selector up among snapshot elements.
pub fn check_selector(selector: &ScriptSelector, elements: &[&Value]) -> SelectorStatus {
    if elements.is_empty() {
        return SelectorStatus::Unchecked;
    }
    match selector.kind {
        SelectorKind::GetByText => check_text(elements, &selector.value, &["text"]),
        SelectorKind::GetByLabel => check_text(elements, &selector.value, LABEL_FIELDS),
        SelectorKind::Locator => check_locator(elements, &selector.value),
    }
}

/// Snapshot pages a script visits, judged by the URLs it mentions; every
/// page when it mentions none.
pub fn pages_for_script(script: &str, snapshot: &ElementSnapshot) -> Vec<String> {
    let mut pages: Vec<String> = snapshot
        .keys()
        .filter(|url| !url.is_empty() && script.contains(url.as_str()))
        .cloned()
        .collect();
    if pages.is_empty() {
        pages = snapshot.keys().cloned().collect();
    }
    pages.sort();
    pages
}

/// Check every selector of the script at `path`.
pub fn check_script(path: &Path, snapshot: &ElementSnapshot) -> CoreResult<SelectorReport> {
    let script = fs::read_to_string(path).map_err(|source| CoreError::Artifact {
        path: path.to_path_buf(),
        source,
    })?;

    let pages = pages_for_script(&script, snapshot);
    let elements: Vec<&Value> = pages
        .iter()
        .filter_map(|url| snapshot.get(url))
        .flatten()
        .collect();

    let checks: Vec<SelectorCheck> = extract_selectors(&script)
        .into_iter()
        .map(|selector| {
            let status = check_selector(&selector, &elements);
            SelectorCheck { selector, status }
        })
        .collect();
    debug!(
        "Checked {} selector(s) in {:?} against {} element(s)",
        checks.len(),
        path,
        elements.len()
    );

    Ok(SelectorReport {
        script: path.to_path_buf(),
        pages,
        checks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn elements() -> Vec<Value> {
        vec![
            json!({"tag": "INPUT", "selector": "css=input, button >> nth=0", "text": "", "name": "username", "id": "user", "type": "text", "role": null}),
            json!({"tag": "INPUT", "selector": "css=input, button >> nth=1", "text": "", "name": "password", "id": "pass", "type": "password", "role": null}),
            json!({"tag": "BUTTON", "selector": "css=input, button >> nth=2", "text": "  Sign\n in ", "name": null, "id": null, "type": "submit", "role": null}),
            json!({"tag": "A", "selector": "css=input, button >> nth=3", "text": "Forgot password?", "name": null, "id": null, "type": null, "role": "link"}),
        ]
    }

    fn check(kind: SelectorKind, value: &str) -> SelectorStatus {
        let elements = elements();
        let refs: Vec<&Value> = elements.iter().collect();
        check_selector(
            &ScriptSelector {
                kind,
                value: value.to_string(),
                line: 1,
            },
            &refs,
        )
    }

    #[test]
    fn test_extract_selectors() {
        let script = "def test_login(page):\n    page.locator('#user').fill('admin')\n    page.get_by_label(\"Password\").fill('x')\n    page.get_by_text(r'Sign in', exact=True).click()\n    page.locator(\"input[name=\\\"username\\\"]\").click()\n    page.goto('http://localhost/')\n";
        let selectors = extract_selectors(script);

        assert_eq!(selectors.len(), 4);
        assert_eq!(selectors[0].kind, SelectorKind::Locator);
        assert_eq!(selectors[0].value, "#user");
        assert_eq!(selectors[0].line, 2);
        assert_eq!(selectors[1].kind, SelectorKind::GetByLabel);
        assert_eq!(selectors[1].value, "Password");
        assert_eq!(selectors[2].kind, SelectorKind::GetByText);
        assert_eq!(selectors[2].value, "Sign in");
        assert_eq!(selectors[3].value, "input[name=\"username\"]");
        assert_eq!(selectors[3].line, 5);
    }

    #[test]
    fn test_text_and_label_lookups() {
        assert_eq!(check(SelectorKind::GetByText, "sign in"), SelectorStatus::Found(1));
        assert_eq!(check(SelectorKind::GetByText, "password"), SelectorStatus::Found(1));
        assert_eq!(check(SelectorKind::GetByText, "Register"), SelectorStatus::NotFound);
        assert_eq!(check(SelectorKind::GetByLabel, "Password"), SelectorStatus::Found(2));
        assert_eq!(check(SelectorKind::GetByLabel, "Email"), SelectorStatus::NotFound);
    }

    #[test]
    fn test_css_lookups() {
        assert_eq!(check(SelectorKind::Locator, "#user"), SelectorStatus::Found(1));
        assert_eq!(check(SelectorKind::Locator, "input[name=\"password\"]"), SelectorStatus::Found(1));
        assert_eq!(check(SelectorKind::Locator, "button[type=submit]"), SelectorStatus::Found(1));
        assert_eq!(check(SelectorKind::Locator, "input"), SelectorStatus::Found(2));
        assert_eq!(check(SelectorKind::Locator, "[role]"), SelectorStatus::Found(1));
        assert_eq!(check(SelectorKind::Locator, "#email"), SelectorStatus::NotFound);
        assert_eq!(check(SelectorKind::Locator, "text=Forgot"), SelectorStatus::Found(1));
        assert_eq!(check(SelectorKind::Locator, "id=pass"), SelectorStatus::Found(1));
        assert_eq!(check(SelectorKind::Locator, "css=input, button >> nth=2"), SelectorStatus::Found(1));
    }

    #[test]
    fn test_unsupported_selectors_unchecked() {
        assert_eq!(check(SelectorKind::Locator, "form > input"), SelectorStatus::Unchecked);
        assert_eq!(check(SelectorKind::Locator, ".btn-primary"), SelectorStatus::Unchecked);
        assert_eq!(check(SelectorKind::Locator, "input[name*=\"user\"]"), SelectorStatus::Unchecked);
        assert_eq!(check(SelectorKind::Locator, "input[placeholder=\"Email\"]"), SelectorStatus::Unchecked);
        assert_eq!(check(SelectorKind::Locator, "//button"), SelectorStatus::Unchecked);

        let selector = ScriptSelector {
            kind: SelectorKind::GetByText,
            value: "Sign in".into(),
            line: 1,
        };
        assert_eq!(check_selector(&selector, &[]), SelectorStatus::Unchecked);
    }

    #[test]
    fn test_check_script_uses_visited_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_playwright_1.py");
        fs::write(
            &path,
            "def test_login(page):\n    page.goto('http://localhost/login')\n    page.get_by_text('Sign in').click()\n    page.get_by_text('Dashboard').click()\n",
        )
        .unwrap();

        let mut snapshot = ElementSnapshot::new();
        snapshot.insert("http://localhost/login".into(), elements());
        snapshot.insert("http://localhost/home".into(), vec![json!({"tag": "H1", "text": "Dashboard"})]);

        let report = check_script(&path, &snapshot).unwrap();
        assert_eq!(report.pages, vec!["http://localhost/login"]);
        assert_eq!(report.found(), 1);
        assert_eq!(report.not_found(), 1);
        assert_eq!(report.unchecked(), 0);
        assert_eq!(report.checks[1].selector.line, 4);

        let json = serde_json::to_value(&report.checks[0]).unwrap();
        assert_eq!(json["status"]["status"], "found");
        assert_eq!(json["status"]["count"], 1);
    }

    #[test]
    fn test_missing_script_is_error() {
        let dir = tempdir().unwrap();
        let result = check_script(&dir.path().join("nope.py"), &ElementSnapshot::new());
        assert!(matches!(result, Err(CoreError::Artifact { .. })));
    }
}
