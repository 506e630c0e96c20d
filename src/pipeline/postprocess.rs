//! Post-processing: deterministic cleanup of model feedback before it is written.
//!
//! Models sometimes wrap their answer in a code fence, emit `\r\n`, or leave
//! zero-width characters behind. These rules remove such artefacts without
//! touching content, so the same response always yields the same bytes on
//! disk.
//!
//! A line that looks exactly like the writer's `=== Page N Feedback ===`
//! marker is indented by one space, so the report can always be cut back
//! into its page files.
//!
//! ## Rule Order
//!
//! Fences are stripped first so the remaining rules see the real text; line
//! endings are normalised before any per-line rule runs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model response.
///
/// The result has no leading or trailing blank lines and no final newline;
/// the writer adds its own framing.
pub fn clean_feedback(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = escape_page_markers(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md|text)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip invisible Unicode ──────────────────────────────────────────

const INVISIBLE: [char; 6] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'];

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 6: Escape page-marker lines ─────────────────────────────────────────

static RE_PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(=== Page \d+ Feedback ===)$").unwrap());

fn escape_page_markers(input: &str) -> String {
    RE_PAGE_MARKER.replace_all(input, " $1").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_with_language() {
        let input = "```markdown\nSTART Question 1\nScore: 4/5\n```";
        assert_eq!(strip_outer_fences(input), "START Question 1\nScore: 4/5");
    }

    #[test]
    fn inner_fences_are_kept() {
        let input = "See this:\n```\nx = 1\n```\nthen more";
        assert_eq!(strip_outer_fences(input), input);
    }

    #[test]
    fn normalises_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(remove_invisible_chars("x\u{200B}=\u{FEFF}1"), "x=1");
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn full_cleanup_has_no_outer_blank_lines() {
        let input = "\n\n```\r\nEND Question 2   \r\n\r\n\r\n\r\n\r\nScore: 5/5\u{200B}\r\n```\n";
        assert_eq!(clean_feedback(input), "END Question 2\n\n\nScore: 5/5");
    }

    #[test]
    fn cleanup_is_idempotent() {
        let once = clean_feedback("  Good work.  \r\n\r\nScore: 3/5\n\n");
        assert_eq!(clean_feedback(&once), once);
    }

    #[test]
    fn marker_lines_are_indented() {
        let input = "Continuing.\n=== Page 7 Feedback ===\nstill page one";
        assert_eq!(
            clean_feedback(input),
            "Continuing.\n === Page 7 Feedback ===\nstill page one"
        );
    }

    #[test]
    fn marker_text_inside_a_line_is_left_alone() {
        let input = "The heading `=== Page 2 Feedback ===` is fine inline.";
        assert_eq!(escape_page_markers(input), input);
    }

    #[test]
    fn escaped_markers_stay_escaped() {
        let once = clean_feedback("=== Page 3 Feedback ===\nScore: 2/5");
        assert_eq!(once, " === Page 3 Feedback ===\nScore: 2/5");
        assert_eq!(clean_feedback(&once), once);
    }
}
