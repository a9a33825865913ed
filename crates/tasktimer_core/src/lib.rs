//! Core domain logic for the inline task timer.
//! Document text is the single source of truth for timer state; this crate
//! only reads, advances and rewrites the markers embedded in it.

pub mod accounting;
pub mod codec;
pub mod config;
pub mod host;
pub mod logging;
pub mod model;
pub mod runtime;
pub mod service;

pub use accounting::{apply, TimerAction, Transition, TransitionError};
pub use codec::{compress_id, expand_id, format_duration, parse, parse_all, render, IdGenerator};
pub use config::{
    AutoStopPolicy, InsertPlacement, PathFilter, PathFilterMode, SettingsError, TimerSettings,
};
pub use host::manual::{ManualClock, ManualScheduler, SystemClock};
pub use host::memory::MemoryHost;
pub use host::{
    Clock, DocumentHost, HostError, HostResult, OpenDocument, ScheduledTask, Scheduler, TaskHandle,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::document::{DocumentId, DocumentLocation, EditMode};
pub use model::session::{Session, SessionToken};
pub use model::timer::{MarkerFormat, MarkerSpan, TimerId, TimerRecord, TimerStatus};
pub use service::{
    BridgeOutcome, MenuAction, OpenReport, TextChange, TickOutcome, TimerOutcome, TimerService,
    TimerServiceError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
