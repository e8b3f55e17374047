//! Message normalisation: make hand-typed field reports predictable.
//!
//! Reports are typed on phones, pasted from chat apps and forwarded by mail,
//! so the same alert shows up with CRLF line endings, doubled spaces, blank
//! lines and a trailing `— Sent from Mapeo —` signature. The extractors match
//! single-space patterns, so every message goes through these rules first.
//!
//! ## Rule Order
//!
//! Line endings are unified before anything that looks at lines. Signature
//! lines are dropped before blank-line collapsing so the hole they leave is
//! cleaned up too. Flattening comes last so the line-based rules have lines
//! to work on.

use crate::config::NormalizeMode;
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalisation rules to a raw message.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Drop a trailing line delimited by em-dashes (`— Sent from Mapeo —`)
/// 3. Remove inline `— Sent from … —` markers
/// 4. Collapse runs of 2+ horizontal whitespace to one space
/// 5. Collapse whitespace around line breaks (also drops blank lines)
/// 6. Flatten to a single line when `mode` is [`NormalizeMode::Flatten`]
/// 7. Trim
pub fn normalize(raw: &str, mode: NormalizeMode) -> String {
    let s = normalise_line_endings(raw);
    let s = drop_signature_line(&s);
    let s = remove_inline_signature(&s);
    let s = collapse_horizontal_whitespace(&s);
    let s = collapse_line_breaks(&s);
    let s = match mode {
        NormalizeMode::Flatten => flatten(&s),
        NormalizeMode::PreserveLines => s,
    };
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Drop the trailing signature line ─────────────────────────────────

/// Only the last non-blank line; em-dash wrapped notes elsewhere are content.
static RE_SIGNATURE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[^\S\n]*—[^\n]*—\s*\z").unwrap());

fn drop_signature_line(input: &str) -> String {
    RE_SIGNATURE_LINE.replace_all(input, "").to_string()
}

// ── Rule 3: Remove inline "sent from" markers ────────────────────────────────

static RE_INLINE_SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)—[^\S\n]*sent from\b[^—\n]*—").unwrap());

fn remove_inline_signature(input: &str) -> String {
    RE_INLINE_SIGNATURE.replace_all(input, " ").to_string()
}

// ── Rule 4: Collapse horizontal whitespace ───────────────────────────────────

static RE_HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]{2,}").unwrap());

fn collapse_horizontal_whitespace(input: &str) -> String {
    RE_HORIZONTAL_WS.replace_all(input, " ").to_string()
}

// ── Rule 5: Collapse whitespace around line breaks ───────────────────────────

static RE_LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]*\n\s*").unwrap());

fn collapse_line_breaks(input: &str) -> String {
    RE_LINE_BREAK.replace_all(input, "\n").to_string()
}

// ── Rule 6: Flatten ──────────────────────────────────────────────────────────

fn flatten(input: &str) -> String {
    input.replace('\n', " ")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "Flood report  —  Flooding\r\n\r\nMarch 5, 2024, 10:15 AM\r\n   UTM 18N 500000 4649776   \r\n\r\nRiver over the bridge\r\n— Sent from Mapeo —\r\n";

    #[test]
    fn test_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_signature_line_dropped() {
        let out = drop_signature_line("body\n— Sent from Mapeo —\n");
        assert!(!out.contains("Sent from"), "got: {out:?}");
        assert!(out.starts_with("body"));
    }

    #[test]
    fn test_inner_dash_wrapped_line_kept() {
        let out = drop_signature_line("body\n— Ranger team 3 —\nmore\n— Sent from Mapeo —\n\n");
        assert_eq!(out, "body\n— Ranger team 3 —\nmore\n");
    }

    #[test]
    fn test_header_line_with_dash_kept() {
        let out = drop_signature_line("Flood report — Flooding\nbody");
        assert_eq!(out, "Flood report — Flooding\nbody");
    }

    #[test]
    fn test_inline_signature_removed() {
        let out = remove_inline_signature("water rising — sent from Mapeo — thanks");
        assert_eq!(out, "water rising   thanks");
    }

    #[test]
    fn test_collapse_horizontal_keeps_newlines() {
        assert_eq!(collapse_horizontal_whitespace("a   b\t\tc\n\nd"), "a b c\n\nd");
    }

    #[test]
    fn test_collapse_line_breaks() {
        assert_eq!(collapse_line_breaks("a  \n \n\n  b"), "a\nb");
    }

    #[test]
    fn test_preserve_lines_mode() {
        let out = normalize(REPORT, NormalizeMode::PreserveLines);
        assert_eq!(
            out,
            "Flood report — Flooding\nMarch 5, 2024, 10:15 AM\nUTM 18N 500000 4649776\nRiver over the bridge"
        );
    }

    #[test]
    fn test_flatten_mode() {
        let out = normalize(REPORT, NormalizeMode::Flatten);
        assert_eq!(
            out,
            "Flood report — Flooding March 5, 2024, 10:15 AM UTM 18N 500000 4649776 River over the bridge"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize("", NormalizeMode::Flatten), "");
        assert_eq!(normalize(" \n\t \r\n", NormalizeMode::PreserveLines), "");
    }
}
