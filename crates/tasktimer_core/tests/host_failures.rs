use std::ops::Range;
use tasktimer_core::{
    DocumentHost, DocumentId, EditMode, HostError, HostResult, ManualClock, ManualScheduler,
    MemoryHost, OpenDocument, ScheduledTask, TickOutcome, TimerService, TimerSettings,
};

const START_MS: i64 = 1_700_000_000_000;

/// Memory host whose reads and writes can be switched to fail.
struct FlakyHost {
    inner: MemoryHost,
    failing: bool,
}

impl FlakyHost {
    fn check(&self) -> HostResult<()> {
        if self.failing {
            return Err(HostError::Io("disk unavailable".to_string()));
        }
        Ok(())
    }
}

impl DocumentHost for FlakyHost {
    fn open_documents(&self) -> Vec<OpenDocument> {
        self.inner.open_documents()
    }

    fn edit_mode(&self, document: &DocumentId) -> HostResult<EditMode> {
        self.check()?;
        self.inner.edit_mode(document)
    }

    fn line_count(&self, document: &DocumentId) -> HostResult<usize> {
        self.check()?;
        self.inner.line_count(document)
    }

    fn line(&self, document: &DocumentId, line: usize) -> HostResult<String> {
        self.check()?;
        self.inner.line(document, line)
    }

    fn set_line(&mut self, document: &DocumentId, line: usize, text: &str) -> HostResult<()> {
        self.check()?;
        self.inner.set_line(document, line, text)
    }

    fn replace_range(
        &mut self,
        document: &DocumentId,
        line: usize,
        range: Range<usize>,
        text: &str,
    ) -> HostResult<()> {
        self.check()?;
        self.inner.replace_range(document, line, range, text)
    }

    fn read_text(&self, document: &DocumentId) -> HostResult<String> {
        self.check()?;
        self.inner.read_text(document)
    }

    fn write_text(&mut self, document: &DocumentId, text: &str) -> HostResult<()> {
        self.check()?;
        self.inner.write_text(document, text)
    }
}

type FlakyService = TimerService<FlakyHost, ManualScheduler, ManualClock>;

fn flaky_service(text: &str) -> (FlakyService, DocumentId) {
    let mut inner = MemoryHost::new();
    let doc = DocumentId::new("synced/notes.md");
    inner.open_with_text(doc.clone(), text, EditMode::Editable);
    let host = FlakyHost {
        inner,
        failing: false,
    };
    let service = TimerService::new(
        host,
        ManualScheduler::new(),
        ManualClock::new(START_MS),
        TimerSettings::default(),
    );
    (service, doc)
}

#[test]
fn unreadable_document_keeps_timer_live_until_host_recovers() {
    let (mut service, doc) = flaky_service("- [ ] sync notes");
    let record = service.start(&doc, 0).expect("start");
    let tick = ScheduledTask::Tick(record.id.clone());

    service.clock().advance_secs(1);
    assert!(matches!(
        service.resolve_and_tick(&record.id),
        TickOutcome::Updated(_)
    ));

    service.host_mut().failing = true;
    service.clock().advance_secs(1);
    assert_eq!(service.resolve_and_tick(&record.id), TickOutcome::Failed);
    assert_eq!(service.registry().len(), 1);
    assert_eq!(service.scheduler().count_of(&tick), 1);
    assert_eq!(
        service.live_record(&record.id).map(|live| live.accumulated),
        Some(1)
    );

    service.host_mut().failing = false;
    service.clock().advance_secs(1);
    let outcome = service.resolve_and_tick(&record.id);
    let TickOutcome::Updated(updated) = &outcome else {
        panic!("expected the timer to resume ticking, got {outcome:?}");
    };
    assert_eq!(updated.accumulated, 3);
    assert!(service
        .host()
        .line(&doc, 0)
        .expect("line")
        .contains("【⏳00:00:03 】"));
}

#[test]
fn pause_on_unreadable_host_leaves_timer_running() {
    let (mut service, doc) = flaky_service("- [ ] sync notes");
    let record = service.start(&doc, 0).expect("start");

    service.host_mut().failing = true;
    service.pause(&doc, 0).expect_err("host is down");
    assert_eq!(service.registry().len(), 1);
    assert_eq!(
        service
            .scheduler()
            .count_of(&ScheduledTask::Tick(record.id.clone())),
        1
    );
}
