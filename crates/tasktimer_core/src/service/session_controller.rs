//! Document-open handling: legacy upgrade and running-marker restore.
//!
//! # Responsibility
//! - Upgrade legacy markers once per document per process.
//! - Decide, per auto-stop policy, whether a running marker without a live
//!   schedule resumes or is force-paused.
//! - Defer work on documents whose content is not loaded yet.
//!
//! # Invariants
//! - The first open event of a process sweeps every open document.
//! - At most one content poll exists per document.
//! - A marker already live in this process is never restored twice.

use crate::accounting::transition::TimerAction;
use crate::codec::marker::{parse, parse_all, upgrade_line};
use crate::config::AutoStopPolicy;
use crate::host::{Clock, DocumentHost, ScheduledTask, Scheduler, TaskHandle};
use crate::model::document::{DocumentId, DocumentLocation};
use crate::model::session::Session;
use crate::model::timer::{TimerId, TimerRecord};
use crate::runtime::location::rewrite_line;
use crate::runtime::registry::LiveRegistry;
use crate::service::timer_service::{ServiceResult, TimerService};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Delay between checks for a just-opened, still empty document.
pub const OPEN_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Checks before the document is processed as-is.
pub const OPEN_POLL_MAX_ATTEMPTS: u32 = 20;

/// What to do with a running marker that has no live schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreDecision {
    Restore,
    ForcePause,
}

impl RestoreDecision {
    fn action(self) -> TimerAction {
        match self {
            Self::Restore => TimerAction::Restore,
            Self::ForcePause => TimerAction::ForcePause,
        }
    }
}

/// Applies the auto-stop policy to one orphaned running marker.
///
/// Under `quit`, a marker resumes when this process ticked it before or when
/// its session stamp names the current session.
pub fn decide(
    policy: AutoStopPolicy,
    record: &TimerRecord,
    registry: &LiveRegistry,
    session: &Session,
) -> RestoreDecision {
    match policy {
        AutoStopPolicy::Never => RestoreDecision::Restore,
        AutoStopPolicy::Close => RestoreDecision::ForcePause,
        AutoStopPolicy::Quit => {
            if registry.was_started(&record.id) || session.owns(record.session.as_ref()) {
                RestoreDecision::Restore
            } else {
                RestoreDecision::ForcePause
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingOpen {
    handle: TaskHandle,
    attempts: u32,
}

/// Per-process bookkeeping for document-open events.
#[derive(Debug, Default)]
pub struct SessionController {
    activated: bool,
    upgraded: BTreeSet<DocumentId>,
    pending: BTreeMap<DocumentId, PendingOpen>,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the first open event has been handled.
    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn is_upgraded(&self, document: &DocumentId) -> bool {
        self.upgraded.contains(document)
    }

    pub fn is_pending(&self, document: &DocumentId) -> bool {
        self.pending.contains_key(document)
    }

    pub(super) fn cancel_pending<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        for (_, pending) in std::mem::take(&mut self.pending) {
            scheduler.cancel(pending.handle);
        }
    }
}

/// Summary of one document-open pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenReport {
    /// Legacy markers rewritten to compact form.
    pub upgraded: usize,
    pub restored: Vec<TimerId>,
    pub force_paused: Vec<TimerId>,
    /// Document had no content yet; a poll was scheduled.
    pub deferred: bool,
}

impl OpenReport {
    fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    fn merge(&mut self, other: OpenReport) {
        self.upgraded += other.upgraded;
        self.restored.extend(other.restored);
        self.force_paused.extend(other.force_paused);
        self.deferred |= other.deferred;
    }
}

impl<H: DocumentHost, S: Scheduler, C: Clock> TimerService<H, S, C> {
    /// Handles a document-open event.
    ///
    /// The first call of a process processes every open document. Later calls
    /// process `document` right away when it has content, otherwise poll for
    /// it at [`OPEN_POLL_INTERVAL`].
    pub fn on_document_opened(&mut self, document: &DocumentId) -> ServiceResult<OpenReport> {
        if !self.controller.activated {
            self.controller.activated = true;
            let mut targets: Vec<DocumentId> = self
                .host
                .open_documents()
                .into_iter()
                .map(|open| open.id)
                .collect();
            if !targets.contains(document) {
                targets.push(document.clone());
            }

            let mut report = OpenReport::default();
            for target in &targets {
                match self.adopt_document(target) {
                    Ok(adopted) => report.merge(adopted),
                    Err(err) => warn!(
                        "event=document_open module=session status=error document={} error={}",
                        target, err
                    ),
                }
            }
            info!(
                "event=session_activate module=session status=ok documents={} upgraded={} restored={} force_paused={}",
                targets.len(),
                report.upgraded,
                report.restored.len(),
                report.force_paused.len()
            );
            return Ok(report);
        }

        if self.has_content(document)? {
            return self.adopt_document(document);
        }
        if !self.controller.pending.contains_key(document) {
            let handle = self.scheduler.schedule_repeating(
                ScheduledTask::AwaitContent(document.clone()),
                OPEN_POLL_INTERVAL,
            );
            self.controller
                .pending
                .insert(document.clone(), PendingOpen { handle, attempts: 0 });
            debug!(
                "event=document_open module=session status=deferred document={}",
                document
            );
        }
        Ok(OpenReport::deferred())
    }

    /// One content poll for a deferred document.
    ///
    /// Processes the document once it has content or the attempt budget is
    /// spent; the poll is cancelled either way.
    pub fn poll_opened_document(&mut self, document: &DocumentId) -> ServiceResult<OpenReport> {
        let attempts = match self.controller.pending.get_mut(document) {
            Some(pending) => {
                pending.attempts += 1;
                pending.attempts
            }
            None => return Ok(OpenReport::default()),
        };

        let ready = self.has_content(document).unwrap_or(false);
        if !ready && attempts < OPEN_POLL_MAX_ATTEMPTS {
            return Ok(OpenReport::deferred());
        }
        if let Some(pending) = self.controller.pending.remove(document) {
            self.scheduler.cancel(pending.handle);
        }
        if !ready {
            debug!(
                "event=document_open module=session status=timeout document={} attempts={}",
                document, attempts
            );
        }
        self.adopt_document(document)
    }

    /// Rewrites every legacy marker in `document` into compact form.
    ///
    /// Returns how many markers were rewritten; a second run returns zero.
    pub fn upgrade_document(&mut self, document: &DocumentId) -> ServiceResult<usize> {
        let line_count = self.host.line_count(document)?;
        let mut rewritten = 0;
        for line in 0..line_count {
            let text = self.host.line(document, line)?;
            let (upgraded, count) = upgrade_line(&text);
            if count == 0 {
                continue;
            }
            rewrite_line(
                &mut self.host,
                &DocumentLocation::new(document.clone(), line),
                &upgraded,
            )?;
            rewritten += count;
        }
        if rewritten > 0 {
            info!(
                "event=marker_upgrade module=session status=ok document={} markers={}",
                document, rewritten
            );
        }
        Ok(rewritten)
    }

    fn has_content(&self, document: &DocumentId) -> ServiceResult<bool> {
        Ok(!self.host.read_text(document)?.trim().is_empty())
    }

    fn adopt_document(&mut self, document: &DocumentId) -> ServiceResult<OpenReport> {
        let mut report = OpenReport::default();
        if !self.controller.upgraded.contains(document) {
            report.upgraded = self.upgrade_document(document)?;
            self.controller.upgraded.insert(document.clone());
        }
        self.restore_running_markers(document, &mut report)?;
        Ok(report)
    }

    fn restore_running_markers(
        &mut self,
        document: &DocumentId,
        report: &mut OpenReport,
    ) -> ServiceResult<()> {
        let line_count = self.host.line_count(document)?;
        for line in 0..line_count {
            let text = self.host.line(document, line)?;
            let running: Vec<TimerId> = parse_all(&text)
                .into_iter()
                .filter(|span| span.record.is_running())
                .map(|span| span.record.id)
                .collect();

            for id in running {
                let location = DocumentLocation::new(document.clone(), line);
                if self.registry.contains(&id) {
                    self.locations.record_location(&id, location);
                    continue;
                }
                // Earlier rewrites on this line shift byte offsets.
                let current = self.host.line(document, line)?;
                let Some(span) = parse(&current, None, Some(&id)) else {
                    continue;
                };
                let decision =
                    decide(self.settings.auto_stop, &span.record, &self.registry, &self.session);
                self.commit(decision.action(), Some(&span), &location)?;
                match decision {
                    RestoreDecision::Restore => report.restored.push(id),
                    RestoreDecision::ForcePause => report.force_paused.push(id),
                }
            }
        }
        Ok(())
    }
}
