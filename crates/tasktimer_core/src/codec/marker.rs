//! Marker scanner and renderer.
//!
//! Compact form:
//! `<span class="timer-r" id="ID" data-dur="SECS" data-ts="ANCHOR">【⏳HH:MM:SS 】</span>`
//! (`timer-p` for paused).
//!
//! Legacy form carries `timerId`, `Status`, `AccumulatedTime`,
//! `currentStartTimeStamp` and an optional `sessionStamp` on a
//! `timer-btn` span. Legacy numeric ids decode to their compressed form, so
//! `render(parse(legacy))` is the upgraded marker.

use crate::codec::id::compress_id;
use crate::model::session::SessionToken;
use crate::model::timer::{MarkerFormat, MarkerSpan, TimerId, TimerRecord, TimerStatus};

const SPAN_OPEN: &str = "<span";
const SPAN_CLOSE: &str = "</span>";

const COMPACT_RUNNING_CLASS: &str = "timer-r";
const COMPACT_PAUSED_CLASS: &str = "timer-p";
const LEGACY_CLASS: &str = "timer-btn";

const LEGACY_STATUS_RUNNING: &str = "Running";
const LEGACY_STATUS_PAUSED: &str = "Paused";
const LEGACY_NULL_TIMESTAMP: &str = "null";

/// Finds the first marker in `line` matching the optional format and id filters.
pub fn parse(
    line: &str,
    format: Option<MarkerFormat>,
    target: Option<&TimerId>,
) -> Option<MarkerSpan> {
    MarkerScanner::new(line).find(|span| {
        format.map_or(true, |wanted| span.format == wanted)
            && target.map_or(true, |id| span.id() == id)
    })
}

/// Returns every marker in `line`, left to right.
pub fn parse_all(line: &str) -> Vec<MarkerSpan> {
    MarkerScanner::new(line).collect()
}

/// Renders `record` in compact form.
pub fn render(record: &TimerRecord) -> String {
    let class = match record.status {
        TimerStatus::Running => COMPACT_RUNNING_CLASS,
        TimerStatus::Paused => COMPACT_PAUSED_CLASS,
    };
    format!(
        "<span class=\"{class}\" id=\"{}\" data-dur=\"{}\" data-ts=\"{}\">【⏳{} 】</span>",
        record.id,
        record.accumulated,
        record.anchor,
        format_duration(record.accumulated)
    )
}

/// Rewrites every legacy marker in `line` into compact form.
///
/// Returns the new line and the number of markers rewritten. Lines without
/// legacy markers come back unchanged with a count of zero.
pub fn upgrade_line(line: &str) -> (String, usize) {
    let legacy: Vec<MarkerSpan> = MarkerScanner::new(line)
        .filter(|span| span.format == MarkerFormat::Legacy)
        .collect();
    let mut upgraded = line.to_string();
    for span in legacy.iter().rev() {
        upgraded.replace_range(span.range.clone(), &render(&span.record));
    }
    (upgraded, legacy.len())
}

/// Formats seconds as zero-padded `HH:MM:SS`; hours widen past 99.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

struct MarkerScanner<'a> {
    line: &'a str,
    cursor: usize,
}

impl<'a> MarkerScanner<'a> {
    fn new(line: &'a str) -> Self {
        Self { line, cursor: 0 }
    }
}

impl Iterator for MarkerScanner<'_> {
    type Item = MarkerSpan;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.line.len() {
            let start = self.cursor + self.line[self.cursor..].find(SPAN_OPEN)?;
            match decode_span_at(self.line, start) {
                Some(span) => {
                    self.cursor = span.range.end;
                    return Some(span);
                }
                None => self.cursor = start + SPAN_OPEN.len(),
            }
        }
        None
    }
}

struct Attribute<'a> {
    name: &'a str,
    value: &'a str,
}

fn attribute<'a>(attributes: &[Attribute<'a>], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|attr| attr.name.eq_ignore_ascii_case(name))
        .map(|attr| attr.value)
}

fn decode_span_at(line: &str, start: usize) -> Option<MarkerSpan> {
    let (attributes, tag_end) = scan_attributes(line, start + SPAN_OPEN.len())?;
    let body_len = line[tag_end..].find(SPAN_CLOSE)?;
    if line[tag_end..tag_end + body_len].contains('<') {
        return None;
    }
    let end = tag_end + body_len + SPAN_CLOSE.len();

    let class = attribute(&attributes, "class")?;
    let (record, format) = if has_class(class, LEGACY_CLASS) {
        (decode_legacy(&attributes)?, MarkerFormat::Legacy)
    } else if has_class(class, COMPACT_RUNNING_CLASS) {
        (
            decode_compact(&attributes, TimerStatus::Running)?,
            MarkerFormat::Compact,
        )
    } else if has_class(class, COMPACT_PAUSED_CLASS) {
        (
            decode_compact(&attributes, TimerStatus::Paused)?,
            MarkerFormat::Compact,
        )
    } else {
        return None;
    };

    Some(MarkerSpan {
        record,
        range: start..end,
        format,
    })
}

fn has_class(class_attr: &str, wanted: &str) -> bool {
    class_attr.split_ascii_whitespace().any(|class| class == wanted)
}

fn decode_compact(attributes: &[Attribute<'_>], status: TimerStatus) -> Option<TimerRecord> {
    let id = non_empty(attribute(attributes, "id")?)?;
    let accumulated = attribute(attributes, "data-dur")?.trim().parse::<u64>().ok()?;
    let anchor = attribute(attributes, "data-ts")?.trim().parse::<i64>().ok()?;
    Some(TimerRecord::new(id, status, accumulated, anchor))
}

fn decode_legacy(attributes: &[Attribute<'_>]) -> Option<TimerRecord> {
    let raw_id = non_empty(attribute(attributes, "timerId")?)?;
    let status = match attribute(attributes, "Status")?.trim() {
        LEGACY_STATUS_RUNNING => TimerStatus::Running,
        LEGACY_STATUS_PAUSED => TimerStatus::Paused,
        _ => return None,
    };
    let accumulated = attribute(attributes, "AccumulatedTime")?
        .trim()
        .parse::<u64>()
        .ok()?;
    let anchor = match attribute(attributes, "currentStartTimeStamp")?.trim() {
        "" | LEGACY_NULL_TIMESTAMP => 0,
        value => value.parse::<i64>().ok()?,
    };

    let mut record = TimerRecord::new(canonical_legacy_id(raw_id)?, status, accumulated, anchor);
    if let Some(stamp) = attribute(attributes, "sessionStamp").and_then(non_empty) {
        record.session = Some(SessionToken::new(stamp));
    }
    Some(record)
}

/// Numeric ids compress; other ids are kept unless the compact form could
/// not carry them inside its double-quoted `id` attribute.
fn canonical_legacy_id(raw_id: &str) -> Option<TimerId> {
    if raw_id.bytes().all(|byte| byte.is_ascii_digit()) {
        if let Ok(timestamp_ms) = raw_id.parse::<u64>() {
            return Some(TimerId::new(compress_id(timestamp_ms)));
        }
    }
    (!raw_id.contains('"')).then(|| TimerId::new(raw_id))
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Scans `name="value"` pairs up to the closing `>` of an opening tag.
///
/// Returns the attributes and the byte offset just past `>`. All delimiters
/// are ASCII, so every slice boundary lands on a `char` boundary.
fn scan_attributes(line: &str, mut pos: usize) -> Option<(Vec<Attribute<'_>>, usize)> {
    let bytes = line.as_bytes();
    if !bytes.get(pos)?.is_ascii_whitespace() {
        return None;
    }

    let mut attributes = Vec::new();
    loop {
        while bytes.get(pos)?.is_ascii_whitespace() {
            pos += 1;
        }
        match *bytes.get(pos)? {
            b'>' => return Some((attributes, pos + 1)),
            b'/' | b'<' => return None,
            _ => {}
        }

        let name_start = pos;
        while bytes
            .get(pos)
            .is_some_and(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':'))
        {
            pos += 1;
        }
        if pos == name_start {
            return None;
        }
        let name = &line[name_start..pos];

        while bytes.get(pos)?.is_ascii_whitespace() {
            pos += 1;
        }
        if bytes[pos] != b'=' {
            attributes.push(Attribute { name, value: "" });
            continue;
        }
        pos += 1;
        while bytes.get(pos)?.is_ascii_whitespace() {
            pos += 1;
        }

        let value = match *bytes.get(pos)? {
            quote @ (b'"' | b'\'') => {
                let value_start = pos + 1;
                let value_len = bytes[value_start..].iter().position(|byte| *byte == quote)?;
                pos = value_start + value_len + 1;
                &line[value_start..value_start + value_len]
            }
            _ => {
                let value_start = pos;
                while bytes
                    .get(pos)
                    .is_some_and(|byte| !byte.is_ascii_whitespace() && *byte != b'>')
                {
                    pos += 1;
                }
                &line[value_start..pos]
            }
        };
        attributes.push(Attribute { name, value });
    }
}
