//! Time accounting state machine.
//!
//! # Responsibility
//! - Map (action, prior record, now) to the next record without any I/O.
//!
//! # Invariants
//! - `accumulated` never decreases.
//! - Each elapsed interval is credited exactly once: every crediting
//!   transition also moves `anchor` to `now`.
//! - `forcepause` and `continue` never credit time.

pub mod transition;

pub use transition::{apply, Transition, TransitionError, TimerAction};
