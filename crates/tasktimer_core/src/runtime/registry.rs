//! Live timer registry.

use crate::host::{ScheduledTask, Scheduler, TaskHandle};
use crate::model::timer::{TimerId, TimerRecord};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Fixed tick period of every live timer.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Cached record plus the handle of its periodic task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveEntry {
    record: TimerRecord,
    handle: TaskHandle,
}

impl LiveEntry {
    pub fn record(&self) -> &TimerRecord {
        &self.record
    }

    pub fn handle(&self) -> TaskHandle {
        self.handle
    }
}

/// Timers this process is actively ticking.
#[derive(Debug, Default)]
pub struct LiveRegistry {
    entries: BTreeMap<TimerId, LiveEntry>,
    started: BTreeSet<TimerId>,
}

impl LiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a periodic tick for `record.id`.
    ///
    /// Returns `false` without scheduling anything when the id is already
    /// live.
    pub fn start<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S, record: TimerRecord) -> bool {
        if self.entries.contains_key(&record.id) {
            return false;
        }
        let handle =
            scheduler.schedule_repeating(ScheduledTask::Tick(record.id.clone()), TICK_INTERVAL);
        debug!(
            "event=live_start module=runtime status=ok timer_id={} handle={}",
            record.id,
            handle.raw()
        );
        self.started.insert(record.id.clone());
        self.entries
            .insert(record.id.clone(), LiveEntry { record, handle });
        true
    }

    /// Cancels and removes the live entry. Idempotent.
    pub fn stop<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S, id: &TimerId) -> bool {
        let Some(entry) = self.entries.remove(id) else {
            return false;
        };
        scheduler.cancel(entry.handle);
        debug!(
            "event=live_stop module=runtime status=ok timer_id={} handle={}",
            id,
            entry.handle.raw()
        );
        true
    }

    pub fn get_data(&self, id: &TimerId) -> Option<&TimerRecord> {
        self.entries.get(id).map(LiveEntry::record)
    }

    /// Replaces the cached record of a live entry.
    ///
    /// Returns `false` when the id is not live.
    pub fn set_data(&mut self, id: &TimerId, record: TimerRecord) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.record = record;
                true
            }
            None => false,
        }
    }

    /// Cancels every live schedule.
    ///
    /// The started-this-session set survives; it belongs to the session, not
    /// to individual schedules.
    pub fn clear_all<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        for entry in self.entries.values() {
            scheduler.cancel(entry.handle);
        }
        self.entries.clear();
    }

    pub fn contains(&self, id: &TimerId) -> bool {
        self.entries.contains_key(id)
    }

    /// Whether `id` has been started at least once during this process.
    pub fn was_started(&self, id: &TimerId) -> bool {
        self.started.contains(id)
    }

    pub fn live_ids(&self) -> Vec<TimerId> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
