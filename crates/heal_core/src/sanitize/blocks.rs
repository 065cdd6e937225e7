//! Empty block completion.

use super::scan::{indent_of, indent_width, logical_lines, scan_lines, LineInfo};

const BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "try", "except", "finally", "with", "def", "class",
    "async", "match", "case",
];

/// Whether a statement's first line opens with a compound-statement keyword.
fn starts_with_block_keyword(line: &str) -> bool {
    let trimmed = line.trim_start();
    BLOCK_KEYWORDS.iter().any(|kw| {
        trimmed
            .strip_prefix(kw)
            .map(|rest| {
                rest.chars()
                    .next()
                    .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
            })
            .unwrap_or(false)
    })
}

/// Indent unit used for inserted bodies: a tab if the file indents with
/// tabs, four spaces otherwise.
fn indent_unit(lines: &[&str], infos: &[LineInfo], header_indent: &str) -> &'static str {
    if header_indent.contains('\t') {
        return "\t";
    }
    if !header_indent.is_empty() {
        return "    ";
    }
    let first_indented = lines
        .iter()
        .zip(infos)
        .filter(|(_, info)| info.starts_statement())
        .map(|(line, _)| indent_of(line))
        .find(|indent| !indent.is_empty());
    match first_indented {
        Some(indent) if indent.starts_with('\t') => "\t",
        _ => "    ",
    }
}

/// Insert `pass` into every compound statement that has no body.
///
/// A header has no body when the next code line is not indented deeper, or
/// when nothing follows it. Blank and comment-only lines are skipped when
/// looking for the next code line.
pub fn fill_empty_blocks(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let infos = scan_lines(&lines);
    let logical = logical_lines(&infos);

    // (insert after physical line index, indentation)
    let mut insertions: Vec<(usize, String)> = Vec::new();

    for (idx, stmt) in logical.iter().enumerate() {
        let header = lines[stmt.first];
        if !starts_with_block_keyword(header) || infos[stmt.last].last_code_char != Some(':') {
            continue;
        }

        let header_width = indent_width(header);
        let has_body = logical
            .get(idx + 1)
            .map_or(false, |next| indent_width(lines[next.first]) > header_width);

        if !has_body {
            let header_indent = indent_of(header);
            let unit = indent_unit(&lines, &infos, header_indent);
            insertions.push((stmt.last, format!("{}{}pass", header_indent, unit)));
        }
    }

    if insertions.is_empty() {
        return lines.join("\n");
    }

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + insertions.len());
    let mut pending = insertions.into_iter().peekable();
    for (i, line) in lines.iter().enumerate() {
        out.push((*line).to_string());
        while let Some((_, body)) = pending.next_if(|(after, _)| *after == i) {
            out.push(body);
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_boundaries() {
        assert!(starts_with_block_keyword("    if x:"));
        assert!(starts_with_block_keyword("else:"));
        assert!(starts_with_block_keyword("try:"));
        assert!(starts_with_block_keyword("async def f():"));
        assert!(starts_with_block_keyword("with(open(p)) as f:"));
        assert!(!starts_with_block_keyword("iffy = 1"));
        assert!(!starts_with_block_keyword("definition = {"));
        assert!(!starts_with_block_keyword("x = 1"));
    }

    #[test]
    fn test_empty_except_mid_file() {
        let src = "try:\n    go()\nexcept Exception:\nprint('after')";
        assert_eq!(
            fill_empty_blocks(src),
            "try:\n    go()\nexcept Exception:\n    pass\nprint('after')"
        );
    }

    #[test]
    fn test_header_at_end_of_file() {
        let src = "def test_x(page):\n    if page:\n        go()\n    else:";
        assert_eq!(
            fill_empty_blocks(src),
            "def test_x(page):\n    if page:\n        go()\n    else:\n        pass"
        );
    }

    #[test]
    fn test_comments_do_not_count_as_body() {
        let src = "for i in range(3):\n    # later\n\nx = 1";
        assert_eq!(
            fill_empty_blocks(src),
            "for i in range(3):\n    pass\n    # later\n\nx = 1"
        );
    }

    #[test]
    fn test_multiline_header() {
        let src = "with page.expect_popup(\n    timeout=5000,\n) as popup:\nx = 1";
        assert_eq!(
            fill_empty_blocks(src),
            "with page.expect_popup(\n    timeout=5000,\n) as popup:\n    pass\nx = 1"
        );
    }

    #[test]
    fn test_tab_indentation() {
        let src = "def f():\n\tif x:\n\ty = 1";
        assert_eq!(fill_empty_blocks(src), "def f():\n\tif x:\n\t\tpass\n\ty = 1");
    }

    #[test]
    fn test_nested_empty_headers() {
        let src = "class A:\n    def f(self):";
        assert_eq!(
            fill_empty_blocks(src),
            "class A:\n    def f(self):\n        pass"
        );
    }

    #[test]
    fn test_inline_bodies_and_strings_untouched() {
        let src = "if x: go()\ns = \"\"\"\nelse:\n\"\"\"\nd = {'a': 1}";
        assert_eq!(fill_empty_blocks(src), src);
    }

    #[test]
    fn test_idempotent() {
        let src = "try:\nexcept:\nfinally:";
        let once = fill_empty_blocks(src);
        assert_eq!(once, "try:\n    pass\nexcept:\n    pass\nfinally:\n    pass");
        assert_eq!(fill_empty_blocks(&once), once);
    }
}
