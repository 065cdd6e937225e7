//! Required import normalization.

use std::collections::{HashMap, HashSet};

use super::scan::{indent_of, logical_lines, scan_lines, LineInfo, LogicalLine};

/// Imports every generated script relies on.
pub const DEFAULT_REQUIRED_IMPORTS: &[&str] = &[
    "import pytest",
    "from playwright.sync_api import sync_playwright",
    "from playwright.sync_api import expect",
    "import re",
];

/// A single-name import requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Module(String),
    Name { module: String, name: String },
}

impl Requirement {
    fn parse(statement: &str) -> Option<Self> {
        let words: Vec<&str> = statement.split_whitespace().collect();
        match words.as_slice() {
            ["import", module] => Some(Self::Module(module.to_string())),
            ["from", module, "import", name] => Some(Self::Name {
                module: module.to_string(),
                name: name.to_string(),
            }),
            _ => None,
        }
    }
}

/// Names bound by top-level import statements.
#[derive(Debug, Default)]
struct ImportIndex {
    modules: HashSet<String>,
    names: HashMap<String, HashSet<String>>,
}

impl ImportIndex {
    fn satisfies(&self, req: &Requirement) -> bool {
        match req {
            Requirement::Module(module) => self.modules.contains(module),
            Requirement::Name { module, name } => self
                .names
                .get(module)
                .map_or(false, |n| n.contains(name) || n.contains("*")),
        }
    }

    fn record(&mut self, statement: &str) {
        let statement = statement.trim();
        if let Some(rest) = statement.strip_prefix("import ") {
            for item in rest.split(',') {
                let parts: Vec<&str> = item.split_whitespace().collect();
                match parts.as_slice() {
                    [module] => {
                        self.modules.insert(module.to_string());
                    }
                    [module, "as", alias] if module == alias => {
                        self.modules.insert(module.to_string());
                    }
                    _ => {}
                }
            }
        } else if let Some(rest) = statement.strip_prefix("from ") {
            let Some((module, names)) = rest.split_once(" import ") else {
                return;
            };
            let entry = self.names.entry(module.trim().to_string()).or_default();
            let names = names.replace(['(', ')'], " ");
            for item in names.split(',') {
                let parts: Vec<&str> = item.split_whitespace().collect();
                match parts.as_slice() {
                    [name] => {
                        entry.insert(name.to_string());
                    }
                    [name, "as", alias] if name == alias => {
                        entry.insert(name.to_string());
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Join a logical line into one statement, dropping comments and
/// continuation backslashes.
fn statement_text(lines: &[&str], stmt: &LogicalLine) -> String {
    lines[stmt.first..=stmt.last]
        .iter()
        .map(|l| {
            let code = l.split('#').next().unwrap_or("");
            code.trim().trim_end_matches('\\').trim().to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_docstring(text: &str) -> bool {
    let t = text.trim_start_matches(['r', 'R', 'u', 'U', 'b', 'B']);
    t.starts_with('"') || t.starts_with('\'')
}

/// Physical line index before which missing imports go: after any shebang,
/// leading comments, module docstring and `from __future__` imports.
fn insertion_point(lines: &[&str], infos: &[LineInfo], logical: &[LogicalLine]) -> usize {
    let mut point = 0;
    let mut seen_statement = false;

    // Leading comment and blank lines
    while point < infos.len() && infos[point].is_blank_or_comment {
        point += 1;
    }

    let start = point;
    for stmt in logical.iter().filter(|s| s.first >= start) {
        let text = statement_text(lines, stmt);
        let docstring =
            !seen_statement && is_docstring(&text) && !infos[stmt.last].continues_next;
        if docstring || text.starts_with("from __future__ import") {
            point = stmt.last + 1;
            seen_statement = true;
        } else {
            break;
        }
    }

    point
}

/// Make every required import present exactly once.
///
/// An import counts as present when a top-level statement already binds the
/// name, including combined imports, parenthesized multi-line imports and
/// star imports. Later exact duplicates of a required import line are
/// removed.
pub fn ensure_imports(text: &str, required: &[String]) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let infos = scan_lines(&lines);
    let logical = logical_lines(&infos);

    let mut index = ImportIndex::default();
    for stmt in &logical {
        if indent_of(lines[stmt.first]).is_empty() {
            index.record(&statement_text(&lines, stmt));
        }
    }

    let missing: Vec<&String> = required
        .iter()
        .filter(|r| Requirement::parse(r).map_or(false, |req| !index.satisfies(&req)))
        .collect();

    // Top-level single-line statements that exactly repeat a required import
    let required_lines: HashSet<&str> = required.iter().map(|r| r.trim()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut drop: HashSet<usize> = HashSet::new();
    for stmt in &logical {
        let line = lines[stmt.first];
        if stmt.first != stmt.last || !indent_of(line).is_empty() {
            continue;
        }
        let trimmed = line.trim();
        if required_lines.contains(trimmed) && !seen.insert(trimmed) {
            drop.insert(stmt.first);
        }
    }

    if missing.is_empty() && drop.is_empty() {
        return lines.join("\n");
    }

    let point = insertion_point(&lines, &infos, &logical);
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + missing.len());

    for (i, line) in lines.iter().enumerate() {
        if i == point {
            out.extend(missing.iter().map(|m| m.trim().to_string()));
        }
        if !drop.contains(&i) {
            out.push((*line).to_string());
        }
    }
    if point >= lines.len() {
        out.extend(missing.iter().map(|m| m.trim().to_string()));
    }

    out.join("\n")
}
