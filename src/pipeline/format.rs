//! Content formatter: classify each summary line into a styled block.
//!
//! Lines are classified independently, so the output preserves line order
//! and never merges or splits lines.
//!
//! | Line (after trimming)              | Style           | Text                 |
//! |------------------------------------|-----------------|----------------------|
//! | empty                              | dropped         |                      |
//! | `# Heading`                        | `Subsection`    | `Heading`            |
//! | `## Heading`, `### Heading`, ...   | `Subsubsection` | `Heading`            |
//! | `- item` / `* item`                | `Bullet`        | `• item`             |
//! | `• item`                           | `Bullet`        | unchanged            |
//! | `KEY FINDINGS:` (short, all caps)  | `Section`       | `KEY FINDINGS`       |
//! | anything else                      | `Body`          | unchanged            |

use crate::output::{FormattedBlock, StyleTag};

/// Bullet glyph prefixed to list items.
pub const BULLET: &str = "• ";

/// Upper bound (exclusive, in characters) for an all-caps section label.
const SECTION_MAX_CHARS: usize = 50;

/// Turn summary text into styled blocks, one per non-blank line.
pub fn format_summary(summary: &str) -> Vec<FormattedBlock> {
    summary.split('\n').filter_map(classify_line).collect()
}

fn classify_line(raw: &str) -> Option<FormattedBlock> {
    let line = raw.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(block) = heading(line) {
        return Some(block);
    }

    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(FormattedBlock::new(
            format!("{BULLET}{}", rest.trim_start()),
            StyleTag::Bullet,
        ));
    }

    if line.starts_with('•') {
        return Some(FormattedBlock::new(line, StyleTag::Bullet));
    }

    if is_section_label(line) {
        let label = line.trim_end_matches(':').trim_end();
        return Some(FormattedBlock::new(label, StyleTag::Section));
    }

    Some(FormattedBlock::new(line, StyleTag::Body))
}

/// `#`-run followed by whitespace. `#hashtag` is not a heading.
fn heading(line: &str) -> Option<FormattedBlock> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if level == 0 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let style = if level == 1 {
        StyleTag::Subsection
    } else {
        StyleTag::Subsubsection
    };
    Some(FormattedBlock::new(rest.trim(), style))
}

fn is_section_label(line: &str) -> bool {
    line.ends_with(':')
        && line.chars().count() < SECTION_MAX_CHARS
        && line.chars().any(char::is_alphabetic)
        && !line.chars().any(char::is_lowercase)
}
