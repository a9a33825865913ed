//! Insertion offsets for new markers.

use crate::config::InsertPlacement;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static CHECKBOX_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-+*]|\d+[.)])\s+\[[^\]]\](?:\s+|$)")
        .expect("valid checkbox prefix regex")
});
static ORDERED_LIST_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s+").expect("valid ordered list regex"));
static UNORDERED_LIST_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-+*]\s+").expect("valid unordered list regex"));
static HEADING_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#{1,6}\s+").expect("valid heading regex"));

/// Byte offset where a new marker goes.
///
/// `head` skips the longest of checkbox, ordered-list, unordered-list or
/// heading prefixes; `tail` is the end of the line. A trailing `\r` left by a
/// CRLF line ending is never crossed.
pub fn insertion_offset(line: &str, placement: InsertPlacement) -> usize {
    let content = line.strip_suffix('\r').unwrap_or(line);
    match placement {
        InsertPlacement::Tail => content.len(),
        InsertPlacement::Head => [
            &*CHECKBOX_PREFIX_RE,
            &*ORDERED_LIST_PREFIX_RE,
            &*UNORDERED_LIST_PREFIX_RE,
            &*HEADING_PREFIX_RE,
        ]
        .iter()
        .filter_map(|pattern| pattern.find(content).map(|found| found.end()))
        .max()
        .unwrap_or(0),
    }
}

/// Marker text padded with a single space wherever it would touch a
/// non-whitespace neighbour at `offset`.
pub fn cushioned(line: &str, offset: usize, marker: &str) -> String {
    let before = line[..offset].chars().next_back();
    let after = line[offset..].chars().next();

    let mut text = String::with_capacity(marker.len() + 2);
    if before.is_some_and(|c| !c.is_whitespace()) {
        text.push(' ');
    }
    text.push_str(marker);
    if after.is_some_and(|c| !c.is_whitespace()) {
        text.push(' ');
    }
    text
}

/// Range to delete when erasing the marker at `range`, including one
/// cushion space.
pub fn erase_range(line: &str, range: Range<usize>) -> Range<usize> {
    let bytes = line.as_bytes();
    if bytes.get(range.end) == Some(&b' ') {
        return range.start..range.end + 1;
    }
    if range.start > 0 && bytes[range.start - 1] == b' ' {
        return range.start - 1..range.end;
    }
    range
}
