//! Grammar-based syntax validation.

use std::cell::RefCell;
use std::fmt;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser, Tree};

use super::scan::{indent_of, indent_width, logical_lines, scan_lines};

thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        let _ = p.set_language(&tree_sitter_python::LANGUAGE.into());
        p
    });
}

/// Why a script failed validation, with a 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxDiagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxDiagnostic {
    fn at(node: Node<'_>, message: impl Into<String>) -> Self {
        let pos = node.start_position();
        Self {
            line: pos.row + 1,
            column: pos.column + 1,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

fn parse(source: &str) -> Option<Tree> {
    PYTHON_PARSER.with(|p| p.borrow_mut().parse(source, None))
}

/// Depth-first search for the first node matching `pred`.
fn find_node<'t>(root: Node<'t>, mut pred: impl FnMut(Node<'t>) -> bool) -> Option<Node<'t>> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if pred(node) {
            return Some(node);
        }
        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn is_comment(node: &Node<'_>) -> bool {
    node.kind() == "comment"
}

fn is_empty_block(node: Node<'_>) -> bool {
    if node.kind() != "block" {
        return false;
    }
    let mut cursor = node.walk();
    let has_statement = node.named_children(&mut cursor).any(|c| !is_comment(&c));
    !has_statement
}

/// Imports, docstrings and comments do nothing when the script runs.
fn is_inert(node: &Node<'_>) -> bool {
    match node.kind() {
        "comment" | "import_statement" | "import_from_statement" | "future_import_statement" => {
            true
        }
        "expression_statement" => {
            node.named_child_count() == 1
                && node.named_child(0).map_or(false, |c| c.kind() == "string")
        }
        _ => false,
    }
}

/// Python 2 statement forms the grammar still accepts.
fn legacy_statement(node: &Node<'_>) -> Option<&'static str> {
    match node.kind() {
        "print_statement" => Some("print"),
        "exec_statement" => Some("exec"),
        _ => None,
    }
}

const TAB_ERROR: &str = "inconsistent use of tabs and spaces in indentation";

/// Check statement indentation the way the Python tokenizer does.
///
/// Each level is tracked twice: with tabs advancing to the next multiple of
/// 8 and with a tab counting as one column. Both must order the levels the
/// same way, otherwise the tab/space mix is ambiguous.
fn check_indentation(source: &str) -> Option<SyntaxDiagnostic> {
    let lines: Vec<&str> = source.lines().collect();
    let infos = scan_lines(&lines);

    let mut levels: Vec<(usize, usize)> = vec![(0, 0)];
    let mut opens_block = false;

    for stmt in logical_lines(&infos) {
        let line = lines[stmt.first];
        let width = indent_width(line);
        let alt = indent_of(line).chars().count();
        let error = |message: &str| SyntaxDiagnostic {
            line: stmt.first + 1,
            column: alt + 1,
            message: message.to_string(),
        };

        let (top, top_alt) = levels.last().copied().unwrap_or((0, 0));
        if width > top {
            if alt <= top_alt {
                return Some(error(TAB_ERROR));
            }
            if !opens_block {
                return Some(error("unexpected indent"));
            }
            levels.push((width, alt));
        } else {
            while levels.len() > 1 && levels.last().map_or(false, |&(w, _)| w > width) {
                levels.pop();
            }
            let (level, level_alt) = levels.last().copied().unwrap_or((0, 0));
            if level != width {
                return Some(error("unindent does not match any outer indentation level"));
            }
            if level_alt != alt {
                return Some(error(TAB_ERROR));
            }
        }

        opens_block = infos[stmt.last].last_code_char == Some(':');
    }

    None
}

/// Check that `source` is a syntactically valid Python module.
///
/// Returns `None` when valid. Never panics; a parser failure is reported as
/// a diagnostic at line 1.
pub fn validate(source: &str) -> Option<SyntaxDiagnostic> {
    let Some(tree) = parse(source) else {
        return Some(SyntaxDiagnostic {
            line: 1,
            column: 1,
            message: "source could not be parsed".to_string(),
        });
    };
    let root = tree.root_node();

    if root.has_error() {
        if let Some(node) = find_node(root, |n| n.is_error() || n.is_missing()) {
            let message = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            return Some(SyntaxDiagnostic::at(node, message));
        }
        return Some(SyntaxDiagnostic::at(root, "invalid syntax"));
    }

    // The grammar accepts header-only compound statements; Python does not.
    if let Some(block) = find_node(root, is_empty_block) {
        let header = block.parent().unwrap_or(block);
        return Some(SyntaxDiagnostic::at(header, "expected an indented block"));
    }

    if let Some(diag) = check_indentation(source) {
        return Some(diag);
    }

    if let Some(node) = find_node(root, |n| legacy_statement(&n).is_some()) {
        let name = legacy_statement(&node).unwrap_or("print");
        return Some(SyntaxDiagnostic::at(
            node,
            format!("Missing parentheses in call to '{}'", name),
        ));
    }

    let mut cursor = root.walk();
    let executable = root.named_children(&mut cursor).any(|n| !is_inert(&n));
    if !executable {
        return Some(SyntaxDiagnostic {
            line: 1,
            column: 1,
            message: "script has no executable statements".to_string(),
        });
    }

    None
}
