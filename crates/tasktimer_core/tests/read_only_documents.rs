use tasktimer_core::{
    parse, DocumentHost, DocumentId, EditMode, HostError, ManualClock, ManualScheduler,
    MemoryHost, ScheduledTask, TimerService, TimerServiceError, TimerSettings, TimerStatus,
};

const START_MS: i64 = 1_700_000_000_000;

type TestService = TimerService<MemoryHost, ManualScheduler, ManualClock>;

fn read_only_service(text: &str) -> (TestService, DocumentId) {
    let mut host = MemoryHost::new();
    let doc = DocumentId::new("preview.md");
    host.open_with_text(doc.clone(), text, EditMode::ReadOnly);
    let service = TimerService::new(
        host,
        ManualScheduler::new(),
        ManualClock::new(START_MS),
        TimerSettings::default(),
    );
    (service, doc)
}

#[test]
fn timers_run_in_read_only_documents_through_whole_text_writes() {
    let (mut service, doc) = read_only_service("# Today\n- [ ] read paper\n- [ ] reply mail\n");
    let record = service.start(&doc, 1).expect("start in read-only view");

    for _ in 0..3 {
        service.clock().advance_secs(1);
        service.run_task(&ScheduledTask::Tick(record.id.clone()));
    }
    let paused = service.pause(&doc, 1).expect("pause");
    assert_eq!(paused.accumulated, 3);

    let text = service.host().read_text(&doc).expect("text");
    let lines: Vec<&str> = text.split('\n').collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "# Today");
    assert_eq!(lines[2], "- [ ] reply mail");
    assert_eq!(lines[3], "");

    let span = parse(lines[1], None, None).expect("marker on line 1");
    assert_eq!(span.record.status, TimerStatus::Paused);
    assert_eq!(span.record.accumulated, 3);
    assert_eq!(span.range.start, "- [ ] ".len());
}

#[test]
fn delete_in_read_only_document_restores_line() {
    let (mut service, doc) = read_only_service("- [ ] task\nnext");
    service.start(&doc, 0).expect("start");
    service.delete(&doc, 0).expect("delete");
    assert_eq!(
        service.host().read_text(&doc).expect("text"),
        "- [ ] task\nnext"
    );
    assert!(service.scheduler().is_empty());
}

#[test]
fn write_to_missing_line_fails_without_registering_timer() {
    let (mut service, doc) = read_only_service("only line");
    let err = service.start(&doc, 5).expect_err("line out of range");
    assert!(matches!(
        err,
        TimerServiceError::Host(HostError::LineOutOfRange { line: 5, .. })
    ));
    assert!(service.registry().is_empty());
    assert!(service.scheduler().is_empty());
}
