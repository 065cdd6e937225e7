//! Markdown fence stripping.

const FENCE: &str = "```";

struct FencedBlock<'a> {
    tag: String,
    lines: Vec<&'a str>,
}

impl FencedBlock<'_> {
    fn is_python(&self) -> bool {
        matches!(self.tag.as_str(), "python" | "py" | "python3")
    }
}

fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<FencedBlock<'_>> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        match current.take() {
            None => {
                if let Some(info) = trimmed.strip_prefix(FENCE) {
                    current = Some(FencedBlock {
                        tag: info.trim_start_matches('`').trim().to_ascii_lowercase(),
                        lines: Vec::new(),
                    });
                }
            }
            Some(mut block) => {
                if trimmed.starts_with(FENCE) && trimmed.chars().all(|c| c == '`') {
                    blocks.push(block);
                } else {
                    block.lines.push(line);
                    current = Some(block);
                }
            }
        }
    }

    // Unterminated fence keeps everything after its opening line.
    if let Some(block) = current {
        blocks.push(block);
    }

    blocks
}

/// Keep only the script inside the first Python fence (or the first fence).
///
/// Removes a leading byte-order mark, leading blank lines and trailing
/// whitespace. Text without a fence passes through otherwise unchanged.
pub fn strip_fences(raw: &str) -> String {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let blocks = fenced_blocks(text);
    let chosen = blocks
        .iter()
        .find(|b| b.is_python())
        .or_else(|| blocks.first());

    let body = match chosen {
        Some(block) => block.lines.join("\n"),
        None => text.to_string(),
    };

    trim_edges(&body)
}

fn trim_edges(text: &str) -> String {
    let mut start = 0;
    for line in text.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }
    text[start..].trim_end().to_string()
}
