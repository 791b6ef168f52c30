//! Content quality signals for the remember pipeline.
//!
//! Flags content that looks transient (instance ids, line numbers,
//! verification receipts) — facts that will be stale by the next session.
//! Warnings are advisory and never block a write.

use regex::Regex;
use std::sync::LazyLock;

static TRANSIENT_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"i-[0-9a-f]{17}", "AWS instance ID"),
        (r"\d+ resources? total", "resource count"),
        (r"(?i)(?:all|every)\b.{0,30}\bverified", "verification receipt"),
        (r"(?i)state (?:is )?clean", "state observation"),
        (r"(?i)(?:deployed|completed|applied) via", "deployment receipt"),
        (r"(?i)\bline \d+\b", "line number reference"),
        (r"\b\d{2,} lines\b", "line count"),
        (r"\b\w+:\d{2,}\b", "function/symbol line reference"),
        (r"\d+→\d+", "line number correction"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).expect("valid regex"), label))
    .collect()
});

/// Scan content for transient patterns and return matching labels.
pub fn check_content_quality(content: &str) -> Vec<String> {
    TRANSIENT_PATTERNS
        .iter()
        .filter(|(pattern, _)| pattern.is_match(content))
        .map(|(_, label)| label.to_string())
        .collect()
}
