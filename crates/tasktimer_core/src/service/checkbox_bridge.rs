//! Checkbox-driven start and pause.
//!
//! # Responsibility
//! - Classify single-line edits that change a task checkbox symbol.
//! - Map entering a running symbol to start/continue and entering a paused
//!   symbol to pause.
//!
//! # Invariants
//! - Multi-line edits, edits where the line is not a task checkbox both
//!   before and after, and edits that keep the symbol category are ignored.
//! - The bridge never acts when disabled or when the path filter rejects the
//!   document.

use crate::config::TimerSettings;
use crate::host::{Clock, DocumentHost, Scheduler};
use crate::model::document::DocumentId;
use crate::model::timer::TimerStatus;
use crate::service::timer_service::{ServiceResult, TimerOutcome, TimerService};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static CHECKBOX_SYMBOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-+*]|\d+[.)])\s+\[(.)\](?:\s|$)").expect("valid checkbox symbol regex")
});

/// One host text-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub document: DocumentId,
    pub first_line: usize,
    pub last_line: usize,
    /// Text of the changed region before the edit.
    pub before: String,
    /// Text of the changed region after the edit.
    pub after: String,
}

impl TextChange {
    pub fn single_line(
        document: DocumentId,
        line: usize,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            document,
            first_line: line,
            last_line: line,
            before: before.into(),
            after: after.into(),
        }
    }

    pub fn is_single_line(&self) -> bool {
        self.first_line == self.last_line
            && !self.before.contains('\n')
            && !self.after.contains('\n')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolCategory {
    Running,
    Paused,
    Other,
}

fn category(symbol: char, settings: &TimerSettings) -> SymbolCategory {
    if settings.is_running_symbol(symbol) {
        SymbolCategory::Running
    } else if settings.is_paused_symbol(symbol) {
        SymbolCategory::Paused
    } else {
        SymbolCategory::Other
    }
}

/// Symbol inside the task checkbox that starts `line`, if any.
pub fn checkbox_symbol(line: &str) -> Option<char> {
    CHECKBOX_SYMBOL_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|symbol| symbol.as_str().chars().next())
}

/// What a checkbox edit asks the timer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeIntent {
    EnterRunning,
    EnterPaused,
}

/// Classifies a text change by its checkbox symbol transition.
pub fn classify(change: &TextChange, settings: &TimerSettings) -> Option<BridgeIntent> {
    if !change.is_single_line() {
        return None;
    }
    let (Some(before), Some(after)) = (
        checkbox_symbol(&change.before),
        checkbox_symbol(&change.after),
    ) else {
        return None;
    };
    let before = category(before, settings);
    let after = category(after, settings);
    if before == after {
        return None;
    }
    match after {
        SymbolCategory::Running => Some(BridgeIntent::EnterRunning),
        SymbolCategory::Paused => Some(BridgeIntent::EnterPaused),
        SymbolCategory::Other => None,
    }
}

/// Result of feeding one text change through the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    Ignored,
    Applied(TimerOutcome),
}

impl<H: DocumentHost, S: Scheduler, C: Clock> TimerService<H, S, C> {
    /// Reacts to a host text change on a task checkbox.
    pub fn on_text_changed(&mut self, change: &TextChange) -> ServiceResult<BridgeOutcome> {
        if !self.settings.checkbox_bridge || !self.settings.path_filter.permits(&change.document)
        {
            return Ok(BridgeOutcome::Ignored);
        }
        let Some(intent) = classify(change, &self.settings) else {
            return Ok(BridgeOutcome::Ignored);
        };

        let document = &change.document;
        let line = change.first_line;
        let status = self
            .marker_at(document, line)?
            .map(|span| span.record.status);
        let outcome = match (intent, status) {
            (BridgeIntent::EnterRunning, None) => {
                TimerOutcome::Created(self.start(document, line)?)
            }
            (BridgeIntent::EnterRunning, Some(TimerStatus::Paused)) => {
                TimerOutcome::Continued(self.resume(document, line)?)
            }
            (BridgeIntent::EnterPaused, Some(TimerStatus::Running)) => {
                TimerOutcome::Paused(self.pause(document, line)?)
            }
            _ => {
                debug!(
                    "event=checkbox_bridge module=service status=skip document={} line={}",
                    document, line
                );
                return Ok(BridgeOutcome::Ignored);
            }
        };
        Ok(BridgeOutcome::Applied(outcome))
    }
}
