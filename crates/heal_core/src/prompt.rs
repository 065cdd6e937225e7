//! Conversations sent to the completion service.

use std::fmt::Write as _;

use heal_cases::TestCase;
use heal_llm::Message;
use serde_json::Value;

use crate::failures::FailureKind;

/// Appended to failure detail that was cut short.
pub const TRUNCATION_MARKER: &str = "\n... [output truncated]";

const REPAIR_INSTRUCTIONS: &str = "You repair Playwright end-to-end tests written in Python with pytest.
Return the complete repaired script, runnable as is, in a single ```python fenced code block and nothing else.
Keep the behaviour the test case describes; change only what the failure requires.
- Fix every syntax and indentation error.
- Input fields that are read-only cannot be filled; set their value with page.evaluate instead of fill or type.
- When a locator matches several elements (strict mode violation), use .first, .nth(i) or a narrower locator.
- Wait explicitly for elements and navigation (locator.wait_for, page.wait_for_url) before interacting or asserting.
- Define every variable before use.
- Import everything the script uses, including pytest, sync_playwright, expect and re.";

const SCRIPT_INSTRUCTIONS: &str = "You write Playwright end-to-end tests in Python with pytest, using the sync API.
Return one complete, runnable script in a single ```python fenced code block and nothing else.
- Define exactly one test function such as `def test_example(page):`.
- Click every input field before filling it.
- Prefer robust selectors: roles, labels, visible text, or specific CSS.
- Wait for elements, page loads and navigation with explicit Playwright waits and sensible timeouts.
- Include all imports the script needs.";

const CASE_INSTRUCTIONS: &str = "You design end-to-end UI test cases from page snapshots.
Return only a JSON array. Each element is an object with the fields
\"name\" (string), \"target_url\" (string), \"steps\" (array of strings) and \"expected_result\" (string).
Cover the main user flows and their error paths; every step must be actionable in a browser.";

const REQUIREMENT_INSTRUCTIONS: &str = "You extract testable requirements from product requirement documents.
Return every requirement as one item of a numbered list, one line per item, and nothing else.
State each requirement as observable behaviour a UI test can check.";

/// Cut `detail` to at most `max_chars` characters, marking the cut.
pub fn truncate_detail(detail: &str, max_chars: usize) -> String {
    match detail.char_indices().nth(max_chars) {
        None => detail.to_string(),
        Some((byte, _)) => format!("{}{}", &detail[..byte], TRUNCATION_MARKER),
    }
}

/// Messages asking for a repaired script.
pub fn repair_messages(
    script_path: &str,
    case: &TestCase,
    original: &str,
    kind: FailureKind,
    detail: &str,
    max_detail_chars: usize,
) -> Vec<Message> {
    let case_json = serde_json::to_string_pretty(case).unwrap_or_else(|_| case.name.clone());

    let mut user = String::new();
    let _ = writeln!(user, "This Playwright test script failed ({}).", kind);
    let _ = writeln!(user, "Script path: {}", script_path);
    let _ = writeln!(user, "\nTest case:\n```json\n{}\n```", case_json);
    let _ = writeln!(user, "\nScript:\n```python\n{}\n```", original.trim_end());
    let _ = writeln!(
        user,
        "\nFailure output:\n```\n{}\n```",
        truncate_detail(detail, max_detail_chars).trim_end()
    );
    user.push_str("\nReturn the repaired script.");

    vec![Message::system(REPAIR_INSTRUCTIONS), Message::user(user)]
}

fn field<'a>(element: &'a Value, key: &str) -> &'a str {
    element.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Describe snapshot elements for a page, one line each.
pub fn describe_elements(elements: &[Value]) -> String {
    if elements.is_empty() {
        return "No element snapshot available for this page.".to_string();
    }
    let mut out = String::from("Elements on the page:\n");
    for element in elements {
        let tag = element.get("tag").and_then(Value::as_str).unwrap_or("N/A");
        let _ = writeln!(
            out,
            "  - tag: {}, selector: '{}', text: '{}', id: '{}', name: '{}', type: '{}', role: '{}'",
            tag,
            field(element, "selector"),
            field(element, "text"),
            field(element, "id"),
            field(element, "name"),
            field(element, "type"),
            field(element, "role"),
        );
    }
    out
}

/// Messages asking for a new script for a case.
pub fn script_messages(case: &TestCase, ordinal: usize, elements: &[Value]) -> Vec<Message> {
    let mut user = String::new();
    let _ = writeln!(user, "Write a Playwright test for this case.\n");
    let _ = writeln!(user, "Name: {}", case.display_name(ordinal));
    if let Some(url) = &case.target_url {
        let _ = writeln!(user, "Target URL: {}", url);
    }
    user.push_str("Steps:\n");
    for step in case.steps.iter().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(user, "- {}", step.trim());
    }
    if let Some(expected) = &case.expected_result {
        let _ = writeln!(user, "Expected result: {}", expected);
    }
    let _ = write!(user, "\n{}", describe_elements(elements));

    vec![Message::system(SCRIPT_INSTRUCTIONS), Message::user(user)]
}

/// Messages asking for the requirements in a product requirement document.
pub fn requirement_messages(document: &str) -> Vec<Message> {
    let user = format!(
        "Extract all test requirements from this document:\n\n{}",
        document.trim_end()
    );
    vec![Message::system(REQUIREMENT_INSTRUCTIONS), Message::user(user)]
}

/// Messages asking for test cases from page snapshots.
pub fn case_messages(snapshots: &[(String, String)]) -> Vec<Message> {
    let mut user = String::from("Design test cases for these pages.\n");
    for (name, content) in snapshots {
        let _ = write!(user, "\nSnapshot {}:\n{}\n", name, content.trim_end());
    }
    vec![Message::system(CASE_INSTRUCTIONS), Message::user(user)]
}
