//! In-memory document host.
//!
//! # Responsibility
//! - Hold documents as line vectors with an edit mode and an open flag.
//! - Back the CLI (one file loaded into memory) and deterministic tests.
//!
//! # Invariants
//! - A document always has at least one (possibly empty) line.
//! - Lines never carry their terminator; a CRLF document keeps its line
//!   ending in [`MemoryHost::text`] while the `DocumentHost` side sees `\n`.
//! - `open_documents` preserves the order in which documents were opened.

use crate::host::{DocumentHost, HostError, HostResult, OpenDocument};
use crate::model::document::{DocumentId, EditMode};
use std::collections::BTreeMap;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::CrLf
        } else {
            Self::Lf
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryDocument {
    lines: Vec<String>,
    ending: LineEnding,
    mode: EditMode,
}

impl MemoryDocument {
    fn from_text(text: &str, mode: EditMode) -> Self {
        let ending = LineEnding::detect(text);
        Self {
            lines: split_lines(text, ending),
            ending,
            mode,
        }
    }
}

/// `DocumentHost` over in-memory text.
#[derive(Debug, Default)]
pub struct MemoryHost {
    documents: BTreeMap<DocumentId, MemoryDocument>,
    open_order: Vec<DocumentId>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a document and marks it open.
    pub fn open_with_text(&mut self, document: impl Into<DocumentId>, text: &str, mode: EditMode) {
        let document = document.into();
        self.documents
            .insert(document.clone(), MemoryDocument::from_text(text, mode));
        self.open(&document);
    }

    /// Adds or replaces a document without opening it.
    pub fn store(&mut self, document: impl Into<DocumentId>, text: &str, mode: EditMode) {
        self.documents
            .insert(document.into(), MemoryDocument::from_text(text, mode));
    }

    /// Marks a stored document open. Returns `false` when it is unknown.
    pub fn open(&mut self, document: &DocumentId) -> bool {
        if !self.documents.contains_key(document) {
            return false;
        }
        if !self.open_order.contains(document) {
            self.open_order.push(document.clone());
        }
        true
    }

    /// Closes a document but keeps its text.
    pub fn close(&mut self, document: &DocumentId) {
        self.open_order.retain(|open| open != document);
    }

    pub fn is_open(&self, document: &DocumentId) -> bool {
        self.open_order.contains(document)
    }

    pub fn set_mode(&mut self, document: &DocumentId, mode: EditMode) -> HostResult<()> {
        self.document_mut(document)?.mode = mode;
        Ok(())
    }

    /// Full text of a document with its original line ending, if known.
    pub fn text(&self, document: &DocumentId) -> Option<String> {
        self.documents
            .get(document)
            .map(|doc| doc.lines.join(doc.ending.as_str()))
    }

    fn document(&self, document: &DocumentId) -> HostResult<&MemoryDocument> {
        self.documents
            .get(document)
            .ok_or_else(|| HostError::DocumentNotFound(document.clone()))
    }

    fn document_mut(&mut self, document: &DocumentId) -> HostResult<&mut MemoryDocument> {
        self.documents
            .get_mut(document)
            .ok_or_else(|| HostError::DocumentNotFound(document.clone()))
    }

    fn line_mut(&mut self, document: &DocumentId, line: usize) -> HostResult<&mut String> {
        let doc = self.document_mut(document)?;
        let line_count = doc.lines.len();
        doc.lines
            .get_mut(line)
            .ok_or_else(|| HostError::LineOutOfRange {
                document: document.clone(),
                line,
                line_count,
            })
    }
}

impl DocumentHost for MemoryHost {
    fn open_documents(&self) -> Vec<OpenDocument> {
        self.open_order
            .iter()
            .filter_map(|id| {
                self.documents.get(id).map(|doc| OpenDocument {
                    id: id.clone(),
                    mode: doc.mode,
                })
            })
            .collect()
    }

    fn edit_mode(&self, document: &DocumentId) -> HostResult<EditMode> {
        Ok(self.document(document)?.mode)
    }

    fn line_count(&self, document: &DocumentId) -> HostResult<usize> {
        Ok(self.document(document)?.lines.len())
    }

    fn line(&self, document: &DocumentId, line: usize) -> HostResult<String> {
        let doc = self.document(document)?;
        doc.lines
            .get(line)
            .cloned()
            .ok_or_else(|| HostError::LineOutOfRange {
                document: document.clone(),
                line,
                line_count: doc.lines.len(),
            })
    }

    fn set_line(&mut self, document: &DocumentId, line: usize, text: &str) -> HostResult<()> {
        *self.line_mut(document, line)? = text.to_string();
        Ok(())
    }

    fn replace_range(
        &mut self,
        document: &DocumentId,
        line: usize,
        range: Range<usize>,
        text: &str,
    ) -> HostResult<()> {
        let target = self.line_mut(document, line)?;
        let valid = range.start <= range.end
            && range.end <= target.len()
            && target.is_char_boundary(range.start)
            && target.is_char_boundary(range.end);
        if !valid {
            return Err(HostError::InvalidRange {
                document: document.clone(),
                line,
                range,
            });
        }
        target.replace_range(range, text);
        Ok(())
    }

    fn read_text(&self, document: &DocumentId) -> HostResult<String> {
        Ok(self.document(document)?.lines.join("\n"))
    }

    fn write_text(&mut self, document: &DocumentId, text: &str) -> HostResult<()> {
        let doc = self.document_mut(document)?;
        doc.lines = split_lines(text, doc.ending);
        Ok(())
    }
}

fn split_lines(text: &str, ending: LineEnding) -> Vec<String> {
    text.split('\n')
        .map(|line| match ending {
            LineEnding::CrLf => line.strip_suffix('\r').unwrap_or(line),
            LineEnding::Lf => line,
        })
        .map(str::to_string)
        .collect()
}
