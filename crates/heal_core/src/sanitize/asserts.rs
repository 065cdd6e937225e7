//! Placeholder assertion removal.

use std::sync::OnceLock;

use regex::Regex;

use super::scan::scan_lines;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*assert(?:\s+\(?|\s*\()\s*False\s*\)?\s*(?:,.*?)?\s*(?:#.*)?$")
            .expect("placeholder assert pattern is valid")
    })
}

/// Whether a line does nothing but `assert False`.
pub fn is_placeholder_assert(line: &str) -> bool {
    placeholder_pattern().is_match(line)
}

/// Delete every `assert False` placeholder line.
///
/// Lines inside triple-quoted strings are left alone.
pub fn remove_placeholder_asserts(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let infos = scan_lines(&lines);

    lines
        .iter()
        .zip(&infos)
        .filter(|(line, info)| info.starts_in_string || !is_placeholder_assert(line))
        .map(|(line, _)| *line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_forms() {
        assert!(is_placeholder_assert("assert False"));
        assert!(is_placeholder_assert("    assert False  "));
        assert!(is_placeholder_assert("assert(False)"));
        assert!(is_placeholder_assert("assert (False)"));
        assert!(is_placeholder_assert("assert False, \"not implemented\""));
        assert!(is_placeholder_assert("assert False  # TODO"));
    }

    #[test]
    fn test_real_assertions_kept() {
        assert!(!is_placeholder_assert("assert False == flag"));
        assert!(!is_placeholder_assert("assert False_positive"));
        assert!(!is_placeholder_assert("assertFalse"));
        assert!(!is_placeholder_assert("assert not False"));
        assert!(!is_placeholder_assert("assert page.title() == 'Home'"));
        assert!(!is_placeholder_assert("x = assert_false()"));
    }

    #[test]
    fn test_removal_skips_strings() {
        let src = "def test_x():\n    assert False\n    doc = \"\"\"\nassert False\n\"\"\"";
        assert_eq!(
            remove_placeholder_asserts(src),
            "def test_x():\n    doc = \"\"\"\nassert False\n\"\"\""
        );
    }
}
