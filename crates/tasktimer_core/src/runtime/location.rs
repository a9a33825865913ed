//! Marker location cache and document patching.
//!
//! # Responsibility
//! - Remember the last known (document, line) of each live timer.
//! - Re-find markers whose cached location went stale.
//! - Apply marker inserts, overwrites and erasures through the host.
//!
//! # Invariants
//! - A cached location is never trusted for a write until the line has been
//!   re-parsed and still carries the timer id.
//! - Read-only documents are patched via whole-text read/modify/write.

use crate::codec::marker::{parse, render};
use crate::config::InsertPlacement;
use crate::host::{DocumentHost, HostError, HostResult};
use crate::model::document::{DocumentLocation, EditMode};
use crate::model::timer::{MarkerSpan, TimerId, TimerRecord};
use crate::runtime::placement::{cushioned, erase_range, insertion_offset};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::ops::Range;

/// Marker found by [`LocationIndex::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMarker {
    pub location: DocumentLocation,
    pub span: MarkerSpan,
}

/// Last known locations of live timers.
#[derive(Debug, Default)]
pub struct LocationIndex {
    locations: BTreeMap<TimerId, DocumentLocation>,
}

impl LocationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_location(&mut self, id: &TimerId, location: DocumentLocation) {
        self.locations.insert(id.clone(), location);
    }

    pub fn location(&self, id: &TimerId) -> Option<&DocumentLocation> {
        self.locations.get(id)
    }

    pub fn forget(&mut self, id: &TimerId) -> Option<DocumentLocation> {
        self.locations.remove(id)
    }

    pub fn clear(&mut self) {
        self.locations.clear();
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Finds the marker for `id`.
    ///
    /// Checks the cached location first (only while its document is open),
    /// then scans every open document line by line. A hit from the scan
    /// refreshes the cache. `Ok(None)` means every open document was read
    /// and none carries the id; any other host failure is returned so the
    /// caller can keep the timer live.
    pub fn resolve<H: DocumentHost + ?Sized>(
        &mut self,
        host: &H,
        id: &TimerId,
    ) -> HostResult<Option<ResolvedMarker>> {
        let open_documents = host.open_documents();

        if let Some(location) = self.locations.get(id) {
            let still_open = open_documents
                .iter()
                .any(|document| document.id == location.document);
            if still_open {
                match host.line(&location.document, location.line) {
                    Ok(text) => {
                        if let Some(span) = parse(&text, None, Some(id)) {
                            return Ok(Some(ResolvedMarker {
                                location: location.clone(),
                                span,
                            }));
                        }
                    }
                    Err(err) if is_stale(&err) => {}
                    Err(err) => return Err(err),
                }
            }
            debug!(
                "event=location_stale module=runtime status=miss timer_id={} document={} line={}",
                id, location.document, location.line
            );
        }

        for document in open_documents {
            let line_count = match host.line_count(&document.id) {
                Ok(count) => count,
                Err(HostError::DocumentNotFound(_)) => continue,
                Err(err) => {
                    warn!(
                        "event=location_scan module=runtime status=error document={} error={}",
                        document.id, err
                    );
                    return Err(err);
                }
            };
            for line in 0..line_count {
                let text = host.line(&document.id, line)?;
                if let Some(span) = parse(&text, None, Some(id)) {
                    let location = DocumentLocation::new(document.id.clone(), line);
                    self.record_location(id, location.clone());
                    debug!(
                        "event=location_relocated module=runtime status=ok timer_id={} document={} line={}",
                        id, location.document, location.line
                    );
                    return Ok(Some(ResolvedMarker { location, span }));
                }
            }
        }
        Ok(None)
    }

    /// Writes `record` at `location`.
    ///
    /// With `existing`, exactly that range is overwritten. Otherwise the
    /// marker is inserted at the placement offset with a one-space cushion.
    /// The location is cached only after the host accepted the write.
    pub fn write<H: DocumentHost + ?Sized>(
        &mut self,
        host: &mut H,
        record: &TimerRecord,
        location: &DocumentLocation,
        existing: Option<&MarkerSpan>,
        placement: InsertPlacement,
    ) -> HostResult<()> {
        let marker = render(record);
        match existing {
            Some(span) => patch_line(host, location, span.range.clone(), &marker)?,
            None => {
                let line = host.line(&location.document, location.line)?;
                let offset = insertion_offset(&line, placement);
                let text = cushioned(&line, offset, &marker);
                patch_line(host, location, offset..offset, &text)?;
            }
        }
        self.record_location(&record.id, location.clone());
        Ok(())
    }

    /// Removes the marker at `span` plus one cushion space and forgets `id`.
    pub fn erase<H: DocumentHost + ?Sized>(
        &mut self,
        host: &mut H,
        id: &TimerId,
        location: &DocumentLocation,
        span: &MarkerSpan,
    ) -> HostResult<()> {
        let line = host.line(&location.document, location.line)?;
        let range = erase_range(&line, span.range.clone());
        patch_line(host, location, range, "")?;
        self.forget(id);
        Ok(())
    }
}

/// Cached location points at a line or document that no longer exists.
fn is_stale(err: &HostError) -> bool {
    matches!(
        err,
        HostError::LineOutOfRange { .. } | HostError::DocumentNotFound(_)
    )
}

/// Replaces a whole line, honouring the document's edit mode.
pub fn rewrite_line<H: DocumentHost + ?Sized>(
    host: &mut H,
    location: &DocumentLocation,
    text: &str,
) -> HostResult<()> {
    match host.edit_mode(&location.document)? {
        EditMode::Editable => host.set_line(&location.document, location.line, text),
        EditMode::ReadOnly => write_through_file(host, location, |_| Ok(text.to_string())),
    }
}

fn patch_line<H: DocumentHost + ?Sized>(
    host: &mut H,
    location: &DocumentLocation,
    range: Range<usize>,
    text: &str,
) -> HostResult<()> {
    match host.edit_mode(&location.document)? {
        EditMode::Editable => {
            host.replace_range(&location.document, location.line, range, text)
        }
        EditMode::ReadOnly => write_through_file(host, location, |line| {
            let valid = range.start <= range.end
                && range.end <= line.len()
                && line.is_char_boundary(range.start)
                && line.is_char_boundary(range.end);
            if !valid {
                return Err(HostError::InvalidRange {
                    document: location.document.clone(),
                    line: location.line,
                    range: range.clone(),
                });
            }
            let mut patched = line.to_string();
            patched.replace_range(range.clone(), text);
            Ok(patched)
        }),
    }
}

/// Read-only path: full-text read, single line replace, full-text write.
///
/// Last writer wins; there is no locking against concurrent edits.
fn write_through_file<H, F>(host: &mut H, location: &DocumentLocation, edit: F) -> HostResult<()>
where
    H: DocumentHost + ?Sized,
    F: FnOnce(&str) -> HostResult<String>,
{
    let content = host.read_text(&location.document)?;
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    let line_count = lines.len();
    let Some(target) = lines.get_mut(location.line) else {
        return Err(HostError::LineOutOfRange {
            document: location.document.clone(),
            line: location.line,
            line_count,
        });
    };
    *target = edit(target)?;
    host.write_text(&location.document, &lines.join("\n"))
}
