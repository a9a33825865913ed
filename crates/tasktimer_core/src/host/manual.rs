//! Caller-driven scheduler and clocks.

use crate::host::{Clock, ScheduledTask, Scheduler, TaskHandle};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledEntry {
    task: ScheduledTask,
    interval: Duration,
}

/// Scheduler whose tasks fire only when the embedding loop asks for them.
///
/// The CLI runs it from a sleep loop; tests fire it directly.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    entries: BTreeMap<TaskHandle, ScheduledEntry>,
    next_handle: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of scheduled tasks in handle order.
    pub fn active_tasks(&self) -> Vec<ScheduledTask> {
        self.entries.values().map(|entry| entry.task.clone()).collect()
    }

    /// Number of schedules registered for `task`.
    pub fn count_of(&self, task: &ScheduledTask) -> usize {
        self.entries
            .values()
            .filter(|entry| &entry.task == task)
            .count()
    }

    pub fn interval_of(&self, task: &ScheduledTask) -> Option<Duration> {
        self.entries
            .values()
            .find(|entry| &entry.task == task)
            .map(|entry| entry.interval)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&mut self, task: ScheduledTask, interval: Duration) -> TaskHandle {
        self.next_handle += 1;
        let handle = TaskHandle::new(self.next_handle);
        self.entries.insert(handle, ScheduledEntry { task, interval });
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        self.entries.remove(&handle);
    }
}

/// Clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// Settable clock for deterministic runs.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<i64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: Cell::new(now_ms),
        }
    }

    pub fn set_millis(&self, now_ms: i64) {
        self.now_ms.set(now_ms);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now_ms.set(self.now_ms.get() + secs * 1_000);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now_ms.get()
    }
}
