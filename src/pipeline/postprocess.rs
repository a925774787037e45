//! Post-processing: deterministic cleanup of the reduce-stage summary.
//!
//! Even with a strict combine prompt, models occasionally return text that
//! is fine to a human reader but trips up the line-based formatter:
//!
//! - the whole answer wrapped in a ` ```markdown ... ``` ` fence
//! - Windows-style `\r\n` line endings
//! - `**bold**` markers that the PDF renderer would print literally
//! - zero-width spaces and BOMs copied from the source document
//!
//! Each rule is a pure `&str → String` pass and is tested on its own.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised because the fence
//! regex expects the raw answer; invisible characters go before trimming so
//! a trailing ZWSP does not keep whitespace alive.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw summary.
///
/// Rules (applied in order):
/// 1. Strip an outer code fence
/// 2. Normalise line endings (CRLF / CR → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, joiners)
/// 4. Remove inline emphasis markers (`**x**`, `__x__`)
/// 5. Trim trailing whitespace per line
/// 6. Collapse runs of blank lines to one
/// 7. Trim leading and trailing blank lines
pub fn clean_summary(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = strip_emphasis(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Strip outer code fence ──────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Remove inline emphasis markers ──────────────────────────────────
//
// The renderer has no inline styling, so `**Revenue:** $5M` would be printed
// with the asterisks. Only paired markers are removed; a lone `*` bullet or
// `2 * 3` stays as written.

static RE_STRONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*\n]+?)\*\*").unwrap());
static RE_STRONG_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__([^_\n]+?)__").unwrap());

fn strip_emphasis(input: &str) -> String {
    let s = RE_STRONG.replace_all(input, "$1");
    RE_STRONG_UNDERSCORE.replace_all(&s, "$1").to_string()
}

// ── Rule 5: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}
