//! Process-local runtime state for live timers.
//!
//! # Responsibility
//! - Track which timers this process is actively ticking.
//! - Remember where each live timer's marker was last seen and patch it.
//!
//! # Invariants
//! - At most one periodic task exists per timer id.
//! - Nothing here is persisted; document text stays the source of truth.

pub mod location;
pub mod placement;
pub mod registry;

pub use location::{LocationIndex, ResolvedMarker};
pub use registry::{LiveEntry, LiveRegistry, TICK_INTERVAL};
