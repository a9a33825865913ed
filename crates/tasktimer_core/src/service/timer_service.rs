//! Timer use-case service.
//!
//! # Responsibility
//! - Own the live registry, location index and session of one process.
//! - Provide start/toggle/pause/continue/delete entry points and the tick
//!   loop.
//! - Keep host capabilities injected so the service stays storage-agnostic.
//!
//! # Invariants
//! - Registry and location state change only after the host accepted the
//!   document write; a failed write leaves the live entry untouched.
//! - A tick for an id that is no longer live is a no-op.
//! - `shutdown` leaves no scheduled task behind.

use crate::accounting::transition::{apply, TimerAction, Transition, TransitionError};
use crate::codec::id::IdGenerator;
use crate::codec::marker::parse;
use crate::config::TimerSettings;
use crate::host::{Clock, DocumentHost, HostError, ScheduledTask, Scheduler};
use crate::model::document::{DocumentId, DocumentLocation};
use crate::model::session::Session;
use crate::model::timer::{MarkerSpan, TimerId, TimerRecord, TimerStatus};
use crate::runtime::location::LocationIndex;
use crate::runtime::registry::LiveRegistry;
use crate::service::session_controller::SessionController;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, TimerServiceError>;

/// Service error for timer use-cases.
#[derive(Debug)]
pub enum TimerServiceError {
    /// Host document capability failed.
    Host(HostError),
    /// Requested action does not fit the marker's current state.
    Transition(TransitionError),
    /// The addressed line carries no marker.
    MarkerNotFound(DocumentLocation),
}

impl Display for TimerServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host(err) => write!(f, "{err}"),
            Self::Transition(err) => write!(f, "{err}"),
            Self::MarkerNotFound(location) => write!(
                f,
                "no timer marker on line {} of {}",
                location.line, location.document
            ),
        }
    }
}

impl Error for TimerServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Host(err) => Some(err),
            Self::Transition(err) => Some(err),
            Self::MarkerNotFound(_) => None,
        }
    }
}

impl From<HostError> for TimerServiceError {
    fn from(value: HostError) -> Self {
        Self::Host(value)
    }
}

impl From<TransitionError> for TimerServiceError {
    fn from(value: TransitionError) -> Self {
        Self::Transition(value)
    }
}

/// What a user-level action did to the addressed marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerOutcome {
    Created(TimerRecord),
    Continued(TimerRecord),
    Paused(TimerRecord),
}

impl TimerOutcome {
    pub fn record(&self) -> &TimerRecord {
        match self {
            Self::Created(record) | Self::Continued(record) | Self::Paused(record) => record,
        }
    }
}

/// The single action a context menu should offer for a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Start,
    Pause,
    Continue,
}

/// Result of one periodic tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Id had no live entry; nothing happened.
    NotLive,
    /// Marker found and advanced.
    Updated(TimerRecord),
    /// Marker found but no longer running; schedule dropped.
    Stopped,
    /// Marker not found in any open document; live entry evicted.
    Evicted,
    /// Host read or write failed; live entry kept as it was.
    Failed,
}

/// Process-wide timer service.
///
/// Constructed once at process start, torn down with [`TimerService::shutdown`].
pub struct TimerService<H, S, C> {
    pub(super) host: H,
    pub(super) scheduler: S,
    pub(super) clock: C,
    pub(super) settings: TimerSettings,
    pub(super) session: Session,
    pub(super) registry: LiveRegistry,
    pub(super) locations: LocationIndex,
    pub(super) ids: IdGenerator,
    pub(super) controller: SessionController,
}

impl<H: DocumentHost, S: Scheduler, C: Clock> TimerService<H, S, C> {
    /// Creates a service and begins a new process session.
    pub fn new(host: H, scheduler: S, clock: C, settings: TimerSettings) -> Self {
        let session = Session::begin(clock.now_millis());
        info!(
            "event=service_start module=service status=ok session={} auto_stop={} placement={}",
            session.token(),
            settings.auto_stop.as_str(),
            settings.placement.as_str()
        );
        Self {
            host,
            scheduler,
            clock,
            settings,
            session,
            registry: LiveRegistry::new(),
            locations: LocationIndex::new(),
            ids: IdGenerator::new(),
            controller: SessionController::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &LiveRegistry {
        &self.registry
    }

    pub fn locations(&self) -> &LocationIndex {
        &self.locations
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Replaces the settings snapshot used by later operations.
    pub fn update_settings(&mut self, settings: TimerSettings) {
        self.settings = settings;
    }

    /// Cached record of a live timer.
    pub fn live_record(&self, id: &TimerId) -> Option<&TimerRecord> {
        self.registry.get_data(id)
    }

    /// First marker on the addressed line, if any.
    pub fn marker_at(&self, document: &DocumentId, line: usize) -> ServiceResult<Option<MarkerSpan>> {
        let text = self.host.line(document, line)?;
        Ok(parse(&text, None, None))
    }

    pub fn menu_action(&self, document: &DocumentId, line: usize) -> ServiceResult<MenuAction> {
        Ok(match self.marker_at(document, line)? {
            Some(span) if span.record.is_running() => MenuAction::Pause,
            Some(_) => MenuAction::Continue,
            None => MenuAction::Start,
        })
    }

    /// Creates a running marker on a marker-less line and starts ticking it.
    pub fn start(&mut self, document: &DocumentId, line: usize) -> ServiceResult<TimerRecord> {
        let location = DocumentLocation::new(document.clone(), line);
        let prior = self.marker_at(document, line)?;
        let id = self.ids.next_id(self.clock.now_millis());
        let record = self.commit(TimerAction::Create(id), prior.as_ref(), &location)?;
        written(record, &location)
    }

    /// Pauses the running marker on the addressed line.
    pub fn pause(&mut self, document: &DocumentId, line: usize) -> ServiceResult<TimerRecord> {
        let location = DocumentLocation::new(document.clone(), line);
        let span = self.require_marker(&location)?;
        let record = self.commit(TimerAction::Pause, Some(&span), &location)?;
        written(record, &location)
    }

    /// Continues the paused marker on the addressed line.
    pub fn resume(&mut self, document: &DocumentId, line: usize) -> ServiceResult<TimerRecord> {
        let location = DocumentLocation::new(document.clone(), line);
        let span = self.require_marker(&location)?;
        let record = self.commit(TimerAction::Continue, Some(&span), &location)?;
        written(record, &location)
    }

    /// Start, pause or continue depending on the line's marker.
    pub fn toggle(&mut self, document: &DocumentId, line: usize) -> ServiceResult<TimerOutcome> {
        match self.marker_at(document, line)? {
            None => self.start(document, line).map(TimerOutcome::Created),
            Some(span) if span.record.status == TimerStatus::Running => {
                self.pause(document, line).map(TimerOutcome::Paused)
            }
            Some(_) => self.resume(document, line).map(TimerOutcome::Continued),
        }
    }

    /// Stops the timer and erases its marker text.
    pub fn delete(&mut self, document: &DocumentId, line: usize) -> ServiceResult<TimerId> {
        let location = DocumentLocation::new(document.clone(), line);
        let span = self.require_marker(&location)?;
        self.commit(TimerAction::Delete, Some(&span), &location)?;
        Ok(span.record.id)
    }

    /// Dispatches one task handed back by the host scheduler.
    pub fn run_task(&mut self, task: &ScheduledTask) {
        match task {
            ScheduledTask::Tick(id) => {
                self.resolve_and_tick(id);
            }
            ScheduledTask::AwaitContent(document) => {
                if let Err(err) = self.poll_opened_document(document) {
                    warn!(
                        "event=document_open module=session status=error document={} error={}",
                        document, err
                    );
                }
            }
        }
    }

    /// Advances one live timer, relocating or evicting it when needed.
    pub fn resolve_and_tick(&mut self, id: &TimerId) -> TickOutcome {
        if !self.registry.contains(id) {
            debug!(
                "event=timer_tick module=service status=skip reason=not_live timer_id={}",
                id
            );
            return TickOutcome::NotLive;
        }

        let found = match self.locations.resolve(&self.host, id) {
            Ok(Some(found)) => found,
            Ok(None) => {
                self.registry.stop(&mut self.scheduler, id);
                self.locations.forget(id);
                info!(
                    "event=timer_orphaned module=service status=ok timer_id={}",
                    id
                );
                return TickOutcome::Evicted;
            }
            Err(err) => {
                warn!(
                    "event=timer_tick module=service status=error reason=resolve timer_id={} error={}",
                    id, err
                );
                return TickOutcome::Failed;
            }
        };

        if !found.span.record.is_running() {
            self.registry.stop(&mut self.scheduler, id);
            self.locations.forget(id);
            info!(
                "event=timer_tick module=service status=skip reason=marker_paused timer_id={}",
                id
            );
            return TickOutcome::Stopped;
        }

        match self.commit(TimerAction::Update, Some(&found.span), &found.location) {
            Ok(Some(record)) => TickOutcome::Updated(record),
            Ok(None) => TickOutcome::Failed,
            Err(err) => {
                warn!(
                    "event=timer_tick module=service status=error timer_id={} error={}",
                    id, err
                );
                TickOutcome::Failed
            }
        }
    }

    /// Cancels every schedule and drops all process-local state.
    pub fn shutdown(&mut self) {
        let live = self.registry.len();
        self.registry.clear_all(&mut self.scheduler);
        self.locations.clear();
        self.controller.cancel_pending(&mut self.scheduler);
        info!(
            "event=service_shutdown module=service status=ok live_timers={}",
            live
        );
    }

    fn require_marker(&self, location: &DocumentLocation) -> ServiceResult<MarkerSpan> {
        self.marker_at(&location.document, location.line)?
            .ok_or_else(|| TimerServiceError::MarkerNotFound(location.clone()))
    }

    /// Applies `action` to `prior`, patches the document, then updates the
    /// registry.
    ///
    /// Returns the written record, or `None` when the marker was removed.
    pub(super) fn commit(
        &mut self,
        action: TimerAction,
        prior: Option<&MarkerSpan>,
        location: &DocumentLocation,
    ) -> ServiceResult<Option<TimerRecord>> {
        let now = self.clock.now_secs();
        let transition = apply(
            &action,
            prior.map(|span| &span.record),
            now,
            self.session.token(),
        )
        .map_err(|err| {
            warn!(
                "event=timer_transition module=service status=error action={} document={} line={} error={}",
                action.name(),
                location.document,
                location.line,
                err
            );
            err
        })?;

        let record = match transition {
            Transition::Remove => {
                if let Some(span) = prior {
                    self.locations
                        .erase(&mut self.host, span.id(), location, span)?;
                    self.registry.stop(&mut self.scheduler, span.id());
                    info!(
                        "event=timer_delete module=service status=ok timer_id={} document={} line={}",
                        span.id(),
                        location.document,
                        location.line
                    );
                }
                return Ok(None);
            }
            Transition::Write(record) => record,
        };

        self.locations.write(
            &mut self.host,
            &record,
            location,
            prior,
            self.settings.placement,
        )?;

        match action {
            TimerAction::Create(_) | TimerAction::Continue | TimerAction::Restore => {
                self.registry.start(&mut self.scheduler, record.clone());
            }
            TimerAction::Update => {
                self.registry.set_data(&record.id, record.clone());
            }
            TimerAction::Pause | TimerAction::ForcePause => {
                self.registry.stop(&mut self.scheduler, &record.id);
                self.locations.forget(&record.id);
            }
            TimerAction::Delete => {}
        }

        if matches!(action, TimerAction::Update) {
            debug!(
                "event=timer_tick module=service status=ok timer_id={} accumulated={}",
                record.id, record.accumulated
            );
        } else {
            info!(
                "event=timer_{} module=service status=ok timer_id={} document={} line={} accumulated={}",
                action.name(),
                record.id,
                location.document,
                location.line,
                record.accumulated
            );
        }
        Ok(Some(record))
    }
}

fn written(record: Option<TimerRecord>, location: &DocumentLocation) -> ServiceResult<TimerRecord> {
    record.ok_or_else(|| TimerServiceError::MarkerNotFound(location.clone()))
}

#[cfg(test)]
mod tests {
    use super::{MenuAction, TickOutcome, TimerOutcome, TimerService, TimerServiceError};
    use crate::config::TimerSettings;
    use crate::host::manual::{ManualClock, ManualScheduler};
    use crate::host::memory::MemoryHost;
    use crate::host::{DocumentHost, ScheduledTask};
    use crate::model::document::{DocumentId, EditMode};
    use crate::model::timer::TimerStatus;

    const START_MS: i64 = 1_700_000_000_000;

    fn service_with(text: &str) -> (TimerService<MemoryHost, ManualScheduler, ManualClock>, DocumentId) {
        let mut host = MemoryHost::new();
        let doc = DocumentId::new("tasks.md");
        host.open_with_text(doc.clone(), text, EditMode::Editable);
        let service = TimerService::new(
            host,
            ManualScheduler::new(),
            ManualClock::new(START_MS),
            TimerSettings::default(),
        );
        (service, doc)
    }

    #[test]
    fn toggle_cycles_start_pause_continue() {
        let (mut service, doc) = service_with("- [ ] task");

        assert_eq!(service.menu_action(&doc, 0).expect("menu"), MenuAction::Start);
        let created = service.toggle(&doc, 0).expect("start");
        assert!(matches!(created, TimerOutcome::Created(_)));
        assert_eq!(service.menu_action(&doc, 0).expect("menu"), MenuAction::Pause);

        service.clock().advance_secs(3);
        let paused = service.toggle(&doc, 0).expect("pause");
        assert!(matches!(paused, TimerOutcome::Paused(_)));
        assert_eq!(paused.record().accumulated, 3);
        assert_eq!(service.menu_action(&doc, 0).expect("menu"), MenuAction::Continue);
        assert!(service.scheduler().is_empty());

        let continued = service.toggle(&doc, 0).expect("continue");
        assert!(matches!(continued, TimerOutcome::Continued(_)));
        assert_eq!(continued.record().status, TimerStatus::Running);
        assert_eq!(service.scheduler().len(), 1);
    }

    #[test]
    fn pause_without_marker_reports_not_found() {
        let (mut service, doc) = service_with("plain");
        let err = service.pause(&doc, 0).expect_err("no marker");
        assert!(matches!(err, TimerServiceError::MarkerNotFound(_)));
    }

    #[test]
    fn start_on_marked_line_is_rejected() {
        let (mut service, doc) = service_with("- [ ] task");
        service.start(&doc, 0).expect("first start");
        let err = service.start(&doc, 0).expect_err("second start");
        assert!(matches!(err, TimerServiceError::Transition(_)));
        assert_eq!(service.registry().len(), 1);
    }

    #[test]
    fn delete_erases_marker_and_schedule() {
        let (mut service, doc) = service_with("- [ ] task");
        let record = service.start(&doc, 0).expect("start");
        let deleted = service.delete(&doc, 0).expect("delete");
        assert_eq!(deleted, record.id);
        assert_eq!(service.host().line(&doc, 0).expect("line"), "- [ ] task");
        assert!(service.registry().is_empty());
        assert!(service.scheduler().is_empty());
    }

    #[test]
    fn tick_on_stopped_id_is_noop() {
        let (mut service, doc) = service_with("- [ ] task");
        let record = service.start(&doc, 0).expect("start");
        service.pause(&doc, 0).expect("pause");
        let before = service.host().line(&doc, 0).expect("line");

        service.clock().advance_secs(10);
        service.run_task(&ScheduledTask::Tick(record.id.clone()));
        assert_eq!(service.resolve_and_tick(&record.id), TickOutcome::NotLive);
        assert_eq!(service.host().line(&doc, 0).expect("line"), before);
    }

    #[test]
    fn tick_stops_when_marker_was_paused_by_hand() {
        let (mut service, doc) = service_with("- [ ] task");
        let record = service.start(&doc, 0).expect("start");
        let paused_text = service
            .host()
            .line(&doc, 0)
            .expect("line")
            .replace("timer-r", "timer-p");
        service
            .host_mut()
            .set_line(&doc, 0, &paused_text)
            .expect("manual edit");

        assert_eq!(service.resolve_and_tick(&record.id), TickOutcome::Stopped);
        assert!(service.scheduler().is_empty());
    }

    #[test]
    fn shutdown_cancels_everything() {
        let (mut service, doc) = service_with("- [ ] a\n- [ ] b");
        service.start(&doc, 0).expect("start a");
        service.start(&doc, 1).expect("start b");
        assert_eq!(service.scheduler().len(), 2);

        service.shutdown();
        assert!(service.scheduler().is_empty());
        assert!(service.registry().is_empty());
        assert!(service.locations().is_empty());
    }
}
