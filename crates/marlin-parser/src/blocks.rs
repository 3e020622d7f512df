//! Heading-block content format.
//!
//! A content file is a sequence of blocks. A block opens with a heading line,
//! a label followed by a colon and nothing else, and runs until the next
//! heading or end of input:
//!
//! ```text
//! Title:
//! About us
//! Body:
//! We build **things**.
//! ```
//!
//! Text before the first heading is dropped. Block lines are concatenated
//! without separators before the preprocessor runs. A repeated label
//! replaces the earlier block's value but keeps its position.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::Document;

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^:\s](?:[^:]*[^:\s])?:$").expect("heading pattern is valid")
});

/// A heading found by the first pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading<'a> {
    /// Label without the trailing colon.
    pub label: &'a str,
    /// Zero-based index of the heading line.
    pub line: usize,
}

/// Return the label if `line` is a heading line.
pub fn heading_label(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    HEADING
        .is_match(line)
        .then(|| &line[..line.len() - 1])
}

/// First pass: locate every heading line.
pub fn scan_headings<'a>(lines: &[&'a str]) -> Vec<Heading<'a>> {
    lines
        .iter()
        .copied()
        .enumerate()
        .filter_map(|(line, text)| heading_label(text).map(|label| Heading { label, line }))
        .collect()
}

/// Parse heading blocks, running every block value through `preprocess`.
pub fn parse_blocks<F>(text: &str, preprocess: F) -> Document
where
    F: Fn(&str) -> String,
{
    let lines: Vec<&str> = text.split('\n').collect();
    let headings = scan_headings(&lines);

    // Second pass: slice the ranges between headings.
    let mut document = Document::new();
    for (i, heading) in headings.iter().enumerate() {
        let start = heading.line + 1;
        let end = headings.get(i + 1).map_or(lines.len(), |next| next.line);

        let raw: String = lines[start..end]
            .iter()
            .map(|&line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        document.insert(heading.label.to_string(), Value::String(preprocess(&raw)));
    }

    document
}

/// Identity preprocessor for plain text content.
pub fn identity(raw: &str) -> String {
    raw.to_string()
}
