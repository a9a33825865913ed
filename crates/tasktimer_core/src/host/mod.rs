//! Host capability contracts consumed by the core.
//!
//! # Responsibility
//! - Describe document access, whole-file access, scheduling and time as
//!   traits so the core stays agnostic to the embedding application.
//! - Provide an in-memory host and a caller-driven scheduler for tests and
//!   the CLI.
//!
//! # Invariants
//! - Line and range arguments use zero-based line indexes and UTF-8 byte
//!   offsets on `char` boundaries.
//! - Hosts report failures through `HostError`; the core never retries.

use crate::model::document::{DocumentId, EditMode};
use crate::model::timer::TimerId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::time::Duration;

pub mod manual;
pub mod memory;

pub type HostResult<T> = Result<T, HostError>;

/// Failures reported by host document capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    DocumentNotFound(DocumentId),
    LineOutOfRange {
        document: DocumentId,
        line: usize,
        line_count: usize,
    },
    InvalidRange {
        document: DocumentId,
        line: usize,
        range: Range<usize>,
    },
    Io(String),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentNotFound(document) => write!(f, "document not found: {document}"),
            Self::LineOutOfRange {
                document,
                line,
                line_count,
            } => write!(
                f,
                "line {line} out of range for {document} ({line_count} lines)"
            ),
            Self::InvalidRange {
                document,
                line,
                range,
            } => write!(
                f,
                "invalid range {}..{} on line {line} of {document}",
                range.start, range.end
            ),
            Self::Io(message) => write!(f, "host io error: {message}"),
        }
    }
}

impl Error for HostError {}

/// One entry of the host's open-document enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDocument {
    pub id: DocumentId,
    pub mode: EditMode,
}

/// Document access capability.
pub trait DocumentHost {
    /// Currently open documents in host order.
    fn open_documents(&self) -> Vec<OpenDocument>;
    fn edit_mode(&self, document: &DocumentId) -> HostResult<EditMode>;
    fn line_count(&self, document: &DocumentId) -> HostResult<usize>;
    fn line(&self, document: &DocumentId, line: usize) -> HostResult<String>;
    fn set_line(&mut self, document: &DocumentId, line: usize, text: &str) -> HostResult<()>;
    /// Replaces `range` of one line with `text`.
    fn replace_range(
        &mut self,
        document: &DocumentId,
        line: usize,
        range: Range<usize>,
        text: &str,
    ) -> HostResult<()>;
    /// Whole-file read. Lines are separated by `\n`.
    fn read_text(&self, document: &DocumentId) -> HostResult<String>;
    /// Whole-file write.
    fn write_text(&mut self, document: &DocumentId, text: &str) -> HostResult<()>;
}

/// Work the host scheduler hands back to `TimerService::run_task`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScheduledTask {
    /// Periodic tick of one live timer.
    Tick(TimerId),
    /// Short poll waiting for a just-opened document to load.
    AwaitContent(DocumentId),
}

/// Host-issued handle of one repeating task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(u64);

impl TaskHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Repeating-callback capability.
///
/// Cancelling an unknown or already cancelled handle is a no-op.
pub trait Scheduler {
    fn schedule_repeating(&mut self, task: ScheduledTask, interval: Duration) -> TaskHandle;
    fn cancel(&mut self, handle: TaskHandle);
}

/// Wall-clock capability.
pub trait Clock {
    fn now_millis(&self) -> i64;

    fn now_secs(&self) -> i64 {
        self.now_millis().div_euclid(1_000)
    }
}
