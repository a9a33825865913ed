//! Timer domain model.
//!
//! # Responsibility
//! - Define the canonical record embedded into document text as a marker.
//! - Describe where a parsed marker sits inside its line.
//!
//! # Invariants
//! - `accumulated` never decreases across transitions.
//! - `id` is stable for the marker lifetime and never reused for another timer.
//! - `anchor` is the epoch second of the last transition.

use crate::model::session::SessionToken;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::Range;

/// Opaque timer identifier, rendered verbatim into marker text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(String);

impl TimerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TimerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TimerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TimerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Timer lifecycle state as encoded in marker text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    /// Time is being credited.
    Running,
    /// Time is frozen at `accumulated`.
    Paused,
}

impl TimerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// On-disk marker encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerFormat {
    /// Current short form (`timer-r` / `timer-p` class flag).
    Compact,
    /// Verbose attribute form written by older releases. Read-only.
    Legacy,
}

/// Canonical timer record carried by one marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub id: TimerId,
    pub status: TimerStatus,
    /// Credited seconds.
    pub accumulated: u64,
    /// Epoch seconds of the last transition.
    pub anchor: i64,
    /// Process session that last wrote this record while running.
    ///
    /// Only legacy markers persist it; compact markers parse to `None`.
    pub session: Option<SessionToken>,
}

impl TimerRecord {
    /// Creates a record without a session stamp.
    pub fn new(id: impl Into<TimerId>, status: TimerStatus, accumulated: u64, anchor: i64) -> Self {
        Self {
            id: id.into(),
            status,
            accumulated,
            anchor,
            session: None,
        }
    }

    /// Returns this record stamped with `session`.
    pub fn with_session(mut self, session: SessionToken) -> Self {
        self.session = Some(session);
        self
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Seconds elapsed between `anchor` and `now`.
    ///
    /// Clamped at zero so a clock stepping backwards never reduces credit.
    pub fn elapsed_since_anchor(&self, now: i64) -> u64 {
        u64::try_from(now.saturating_sub(self.anchor)).unwrap_or(0)
    }
}

/// Parsed marker plus its byte range within the source line.
///
/// `range` is half-open and always lies on `char` boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSpan {
    pub record: TimerRecord,
    pub range: Range<usize>,
    pub format: MarkerFormat,
}

impl MarkerSpan {
    pub fn id(&self) -> &TimerId {
        &self.record.id
    }
}
