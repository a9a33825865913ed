use tasktimer_core::{
    parse, render, BridgeOutcome, DocumentHost, DocumentId, EditMode, ManualClock, ManualScheduler,
    MarkerFormat, MemoryHost, ScheduledTask, TextChange, TickOutcome, TimerOutcome, TimerService,
    TimerSettings, TimerStatus,
};

const START_MS: i64 = 1_700_000_000_000;

type TestService = TimerService<MemoryHost, ManualScheduler, ManualClock>;

fn service_with(text: &str) -> (TestService, DocumentId) {
    let mut host = MemoryHost::new();
    let doc = DocumentId::new("daily/today.md");
    host.open_with_text(doc.clone(), text, EditMode::Editable);
    let service = TimerService::new(
        host,
        ManualScheduler::new(),
        ManualClock::new(START_MS),
        TimerSettings::default(),
    );
    (service, doc)
}

fn tick_all(service: &mut TestService) {
    for task in service.scheduler().active_tasks() {
        service.run_task(&task);
    }
}

fn marker_line(service: &TestService, doc: &DocumentId, line: usize) -> String {
    service.host().line(doc, line).expect("line should exist")
}

#[test]
fn start_inserts_running_marker_after_checkbox() {
    let (mut service, doc) = service_with("- [ ] write report");
    let record = service.start(&doc, 0).expect("start");

    let line = marker_line(&service, &doc, 0);
    let span = parse(&line, None, None).expect("marker present");
    assert_eq!(span.range.start, 6);
    assert_eq!(span.format, MarkerFormat::Compact);
    assert_eq!(span.record.status, TimerStatus::Running);
    assert_eq!(span.record.accumulated, 0);
    assert_eq!(span.record.id, record.id);
    assert!(line.contains("【⏳00:00:00 】"));
    assert!(line.starts_with("- [ ] <span"));
    assert!(line.ends_with("</span> write report"));
    assert_eq!(
        service
            .scheduler()
            .count_of(&ScheduledTask::Tick(record.id.clone())),
        1
    );
}

#[test]
fn pause_credits_elapsed_then_continue_and_ticks_add_more() {
    let (mut service, doc) = service_with("- [ ] write report");
    let record = service.start(&doc, 0).expect("start");

    service.clock().advance_secs(5);
    let paused = service.pause(&doc, 0).expect("pause");
    assert_eq!(paused.status, TimerStatus::Paused);
    assert_eq!(paused.accumulated, 5);
    assert!(marker_line(&service, &doc, 0).contains("【⏳00:00:05 】"));

    service.clock().advance_secs(60);
    service.resume(&doc, 0).expect("continue");
    for _ in 0..3 {
        service.clock().advance_secs(1);
        tick_all(&mut service);
    }
    assert_eq!(
        service.live_record(&record.id).map(|live| live.accumulated),
        Some(8)
    );

    let paused = service.pause(&doc, 0).expect("second pause");
    assert_eq!(paused.accumulated, 8);
    assert!(marker_line(&service, &doc, 0).contains("【⏳00:00:08 】"));
}

#[test]
fn checkbox_symbols_start_and_pause_a_timer() {
    let (mut service, doc) = service_with("- [/] plan sprint");
    let outcome = service
        .on_text_changed(&TextChange::single_line(
            doc.clone(),
            0,
            "- [ ] plan sprint",
            "- [/] plan sprint",
        ))
        .expect("bridge start");
    let BridgeOutcome::Applied(TimerOutcome::Created(created)) = &outcome else {
        panic!("expected a created timer, got {outcome:?}");
    };
    assert_eq!(created.status, TimerStatus::Running);

    // The marker insert itself is a text change that keeps the symbol.
    let with_marker = marker_line(&service, &doc, 0);
    let echo = service
        .on_text_changed(&TextChange::single_line(
            doc.clone(),
            0,
            "- [/] plan sprint",
            with_marker.clone(),
        ))
        .expect("echo edit");
    assert_eq!(echo, BridgeOutcome::Ignored);

    service.clock().advance_secs(7);
    let checked = with_marker.replacen("[/]", "[x]", 1);
    service
        .host_mut()
        .set_line(&doc, 0, &checked)
        .expect("user checks the box");
    let outcome = service
        .on_text_changed(&TextChange::single_line(doc.clone(), 0, with_marker, checked))
        .expect("bridge pause");
    let BridgeOutcome::Applied(TimerOutcome::Paused(paused)) = &outcome else {
        panic!("expected a paused timer, got {outcome:?}");
    };
    assert_eq!(paused.id, created.id);
    assert_eq!(paused.accumulated, 7);
    assert!(service.registry().is_empty());
}

#[test]
fn accumulated_never_decreases_even_when_clock_steps_back() {
    let (mut service, doc) = service_with("- [ ] long task");
    let record = service.start(&doc, 0).expect("start");

    let mut last = 0;
    for step in [1, 3, -10, 2, 0, 5, -1, 1] {
        service.clock().advance_secs(step);
        tick_all(&mut service);
        let current = service
            .live_record(&record.id)
            .map(|live| live.accumulated)
            .expect("timer stays live");
        assert!(current >= last, "accumulated went from {last} to {current}");
        last = current;
    }
}

#[test]
fn repeated_toggles_keep_at_most_one_schedule_per_timer() {
    let (mut service, doc) = service_with("- [ ] a\n- [ ] b");
    let a = service.start(&doc, 0).expect("start a");
    let b = service.start(&doc, 1).expect("start b");

    for _ in 0..4 {
        service.toggle(&doc, 0).expect("toggle a");
        service.on_document_opened(&doc).expect("reopen");
        for id in [&a.id, &b.id] {
            assert!(service.scheduler().count_of(&ScheduledTask::Tick(id.clone())) <= 1);
        }
    }
    assert_eq!(service.scheduler().count_of(&ScheduledTask::Tick(b.id.clone())), 1);
}

#[test]
fn tick_follows_marker_moved_to_another_line() {
    let (mut service, doc) = service_with("- [ ] task");
    let record = service.start(&doc, 0).expect("start");

    let text = service.host().read_text(&doc).expect("text");
    service
        .host_mut()
        .write_text(&doc, &format!("# Inserted heading\n\n{text}"))
        .expect("user inserts lines above");

    service.clock().advance_secs(2);
    let outcome = service.resolve_and_tick(&record.id);
    let TickOutcome::Updated(updated) = &outcome else {
        panic!("expected an update, got {outcome:?}");
    };
    assert_eq!(updated.accumulated, 2);
    assert_eq!(
        service.locations().location(&record.id).map(|loc| loc.line),
        Some(2)
    );
    assert!(marker_line(&service, &doc, 2).contains("【⏳00:00:02 】"));
}

#[test]
fn tick_evicts_timer_whose_marker_was_deleted() {
    let (mut service, doc) = service_with("- [ ] task");
    let record = service.start(&doc, 0).expect("start");
    service
        .host_mut()
        .set_line(&doc, 0, "- [ ] task")
        .expect("user deletes the marker");

    service.clock().advance_secs(1);
    assert_eq!(service.resolve_and_tick(&record.id), TickOutcome::Evicted);
    assert!(service.registry().is_empty());
    assert!(service.scheduler().is_empty());
    assert!(service.locations().is_empty());
    assert_eq!(service.resolve_and_tick(&record.id), TickOutcome::NotLive);
}

#[test]
fn tail_placement_appends_with_cushion() {
    let mut host = MemoryHost::new();
    let doc = DocumentId::new("notes.md");
    host.open_with_text(doc.clone(), "## Reading", EditMode::Editable);
    let settings = TimerSettings {
        placement: tasktimer_core::InsertPlacement::Tail,
        ..TimerSettings::default()
    };
    let mut service = TimerService::new(
        host,
        ManualScheduler::new(),
        ManualClock::new(START_MS),
        settings,
    );

    service.start(&doc, 0).expect("start");
    let line = marker_line(&service, &doc, 0);
    assert!(line.starts_with("## Reading <span class=\"timer-r\""));
    assert!(line.ends_with("</span>"));
}

#[test]
fn crlf_document_keeps_line_endings_around_new_marker() {
    let mut host = MemoryHost::new();
    let doc = DocumentId::new("windows.md");
    host.open_with_text(doc.clone(), "- [ ] task\r\nnext\r\n", EditMode::Editable);
    let settings = TimerSettings {
        placement: tasktimer_core::InsertPlacement::Tail,
        ..TimerSettings::default()
    };
    let mut service = TimerService::new(
        host,
        ManualScheduler::new(),
        ManualClock::new(START_MS),
        settings,
    );

    let record = service.start(&doc, 0).expect("start");
    assert_eq!(
        service.host().text(&doc),
        Some(format!("- [ ] task {}\r\nnext\r\n", render(&record)))
    );
}
