//! Line-level lexical scan of Python source.
//!
//! The text passes work on physical lines but must not mistake the inside of
//! a string or a bracketed continuation for a statement. This scan tracks
//! just enough state for that: open triple-quoted strings, bracket depth and
//! backslash continuations.

/// Lexical facts about one physical line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LineInfo {
    /// The line begins inside a triple-quoted string.
    pub starts_in_string: bool,
    /// The line begins inside brackets or after a backslash continuation.
    pub continues_previous: bool,
    /// The logical line carries on past this line.
    pub continues_next: bool,
    /// Last character outside strings and comments, ignoring whitespace.
    pub last_code_char: Option<char>,
    /// Nothing but whitespace and possibly a comment.
    pub is_blank_or_comment: bool,
}

impl LineInfo {
    /// First physical line of a logical line.
    pub fn starts_statement(&self) -> bool {
        !self.starts_in_string && !self.continues_previous && !self.is_blank_or_comment
    }
}

/// A statement spanning one or more physical lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LogicalLine {
    pub first: usize,
    pub last: usize,
}

pub(crate) fn scan_lines(lines: &[&str]) -> Vec<LineInfo> {
    let mut infos = Vec::with_capacity(lines.len());
    let mut triple: Option<char> = None;
    let mut depth: usize = 0;
    let mut backslash = false;

    for line in lines {
        let mut info = LineInfo {
            starts_in_string: triple.is_some(),
            continues_previous: triple.is_none() && (depth > 0 || backslash),
            ..Default::default()
        };
        backslash = false;

        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        let mut saw_code = false;

        while i < chars.len() {
            let c = chars[i];

            if let Some(q) = triple {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == q && chars.get(i + 1) == Some(&q) && chars.get(i + 2) == Some(&q) {
                    triple = None;
                    info.last_code_char = Some(q);
                    i += 3;
                    continue;
                }
                i += 1;
                continue;
            }

            match c {
                '#' => break,
                '\'' | '"' => {
                    saw_code = true;
                    if chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c) {
                        triple = Some(c);
                        i += 3;
                        continue;
                    }
                    // Single-line string; an unterminated one ends at end of line.
                    i += 1;
                    while i < chars.len() && chars[i] != c {
                        if chars[i] == '\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                    info.last_code_char = Some(c);
                    i += 1;
                    continue;
                }
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                _ => {}
            }

            if !c.is_whitespace() {
                saw_code = true;
                info.last_code_char = Some(c);
            }
            i += 1;
        }

        if triple.is_none() && info.last_code_char == Some('\\') {
            backslash = true;
        }

        info.is_blank_or_comment = !info.starts_in_string && !saw_code;
        info.continues_next = triple.is_some() || depth > 0 || backslash;
        infos.push(info);
    }

    infos
}

/// Group physical lines into logical lines, skipping blank and comment lines.
pub(crate) fn logical_lines(infos: &[LineInfo]) -> Vec<LogicalLine> {
    let mut result = Vec::new();
    let mut i = 0;

    while i < infos.len() {
        if !infos[i].starts_statement() {
            i += 1;
            continue;
        }
        let first = i;
        while i + 1 < infos.len() && infos[i].continues_next {
            i += 1;
        }
        result.push(LogicalLine { first, last: i });
        i += 1;
    }

    result
}

/// Leading whitespace of a line.
pub(crate) fn indent_of(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// Indentation width with tabs advancing to the next multiple of 8.
pub(crate) fn indent_width(line: &str) -> usize {
    indent_of(line).chars().fold(0, |width, c| match c {
        '\t' => (width / 8 + 1) * 8,
        _ => width + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> Vec<LineInfo> {
        let lines: Vec<&str> = src.lines().collect();
        scan_lines(&lines)
    }

    #[test]
    fn test_comment_and_string_colons() {
        let infos = scan("if x:  # note\ny = 'a:'\nz = 1 # trailing:");
        assert_eq!(infos[0].last_code_char, Some(':'));
        assert_eq!(infos[1].last_code_char, Some('\''));
        assert_eq!(infos[2].last_code_char, Some('1'));
    }

    #[test]
    fn test_triple_quoted_lines() {
        let infos = scan("s = \"\"\"\nif inside:\n\"\"\"\nx = 1");
        assert!(!infos[0].starts_in_string);
        assert!(infos[1].starts_in_string);
        assert!(infos[2].starts_in_string);
        assert!(!infos[3].starts_in_string);
        assert!(infos[3].starts_statement());
    }

    #[test]
    fn test_bracket_continuation() {
        let src = "with page.expect_popup(\n    timeout=5000,\n) as popup:\n    pass";
        let infos = scan(src);
        let logical = logical_lines(&infos);

        assert_eq!(logical[0], LogicalLine { first: 0, last: 2 });
        assert_eq!(infos[2].last_code_char, Some(':'));
        assert_eq!(logical[1], LogicalLine { first: 3, last: 3 });
    }

    #[test]
    fn test_backslash_continuation() {
        let infos = scan("if a and \\\n   b:\n    pass");
        let logical = logical_lines(&infos);
        assert_eq!(logical[0], LogicalLine { first: 0, last: 1 });
    }

    #[test]
    fn test_indent_width() {
        assert_eq!(indent_width("    x"), 4);
        assert_eq!(indent_width("\tx"), 8);
        assert_eq!(indent_width("  \tx"), 8);
        assert_eq!(indent_of("\t  x"), "\t  ");
    }
}
