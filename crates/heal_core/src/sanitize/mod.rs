//! Code sanitizer.
//!
//! Turns raw model output into a script that parses, or reports why it
//! cannot. The passes run in a fixed order; each is a pure, total function
//! of its input and applying the pipeline twice gives the same script as
//! applying it once.
//!
//! 1. [`strip_fences`] keeps the inside of the first fenced code block
//! 2. [`remove_placeholder_asserts`] drops `assert False` lines
//! 3. [`fill_empty_blocks`] gives header-only compound statements a `pass` body
//! 4. [`ensure_imports`] adds missing required imports
//! 5. [`validate`] parses the result with the Python grammar

mod asserts;
mod blocks;
mod fences;
mod imports;
mod scan;
mod validate;

pub use asserts::{is_placeholder_assert, remove_placeholder_asserts};
pub use blocks::fill_empty_blocks;
pub use fences::strip_fences;
pub use imports::{ensure_imports, DEFAULT_REQUIRED_IMPORTS};
pub use validate::{validate, SyntaxDiagnostic};

use serde::Serialize;

/// Result of sanitizing one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sanitized {
    /// Post-processed script, ending in exactly one newline.
    pub script: String,
    /// Why the script does not parse, if it does not.
    pub diagnostic: Option<SyntaxDiagnostic>,
}

impl Sanitized {
    pub fn is_valid(&self) -> bool {
        self.diagnostic.is_none()
    }
}

/// Sanitizer with a configurable set of required imports.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    required_imports: Vec<String>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            required_imports: DEFAULT_REQUIRED_IMPORTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Sanitizer {
    pub fn new(required_imports: Vec<String>) -> Self {
        Self { required_imports }
    }

    pub fn required_imports(&self) -> &[String] {
        &self.required_imports
    }

    /// Run the full pipeline.
    pub fn sanitize(&self, raw: &str) -> Sanitized {
        let text = raw.replace("\r\n", "\n");
        let text = strip_fences(&text);
        let text = remove_placeholder_asserts(&text);
        let text = fill_empty_blocks(&text);
        let text = ensure_imports(&text, &self.required_imports);

        let mut script = text.trim_end().to_string();
        script.push('\n');

        let diagnostic = validate(&script);
        Sanitized { script, diagnostic }
    }
}

/// Sanitize with the default required imports.
pub fn sanitize(raw: &str) -> Sanitized {
    Sanitizer::default().sanitize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "import pytest\n\
        from playwright.sync_api import sync_playwright\n\
        from playwright.sync_api import expect\n\
        import re\n\
        \n\
        \n\
        def test_login(page):\n    \
            page.goto(\"http://localhost:8080/login\")\n    \
            page.get_by_label(\"User\").click()\n    \
            page.get_by_label(\"User\").fill(\"admin\")\n    \
            expect(page).to_have_title(re.compile(\"Home\"))\n";

    #[test]
    fn test_fence_round_trip() {
        let wrapped = format!("Here is the fixed script:\n```python\n{}```\nLet me know.", SCRIPT);
        let out = sanitize(&wrapped);
        assert!(out.is_valid(), "{:?}", out.diagnostic);
        assert_eq!(out.script, SCRIPT);
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            SCRIPT.to_string(),
            "```python\ndef test_x(page):\n    try:\n        page.click('a')\n    except Exception:\n```".to_string(),
            "def test_x(page):\n    assert False\n".to_string(),
            "```\nimport re, pytest\nclass T:\n    def test_a(self):\n".to_string(),
            "not python at all (".to_string(),
        ];
        for input in inputs {
            let once = sanitize(&input);
            let twice = sanitize(&once.script);
            assert_eq!(once.script, twice.script, "input: {:?}", input);
            assert_eq!(once.is_valid(), twice.is_valid());
        }
    }

    #[test]
    fn test_empty_except_becomes_valid() {
        let raw = "def test_x(page):\n    try:\n        page.click('#go')\n    except Exception:\n";
        let out = sanitize(raw);

        assert!(out.is_valid(), "{:?}", out.diagnostic);
        assert!(out
            .script
            .ends_with("    except Exception:\n        pass\n"));
        assert_eq!(out.script.matches("pass").count(), 1);
    }

    #[test]
    fn test_assert_false_alone_is_invalid() {
        let out = sanitize("```python\nassert False\n```");
        assert!(!out.is_valid());
        assert!(!out.script.contains("assert False"));
    }

    #[test]
    fn test_assert_false_in_function_gets_pass() {
        let out = sanitize("def test_placeholder():\n    assert False\n");
        assert!(out.is_valid(), "{:?}", out.diagnostic);
        assert!(out.script.ends_with("def test_placeholder():\n    pass\n"));
    }

    #[test]
    fn test_output_ends_with_single_newline() {
        let out = sanitize("x = 1\n\n\n\n");
        assert!(out.script.ends_with("x = 1\n"));
        assert!(!out.script.ends_with("\n\n"));
    }

    #[test]
    fn test_invalid_input_never_panics() {
        for raw in ["", "```", "def", "\u{feff}", "'''", "((((", "x = = 1"] {
            let out = sanitize(raw);
            assert!(!out.is_valid(), "{:?}", raw);
            assert!(out.script.ends_with('\n'));
        }
    }

    #[test]
    fn test_custom_required_imports() {
        let sanitizer = Sanitizer::new(vec!["import os".to_string()]);
        let out = sanitizer.sanitize("print(os.getcwd())");
        assert_eq!(out.script, "import os\nprint(os.getcwd())\n");
        assert!(out.is_valid());
    }
}
